//! Per-tick deadline evaluation.
//!
//! The engine is pure: given a [`TickInput`] (group, local time, roster,
//! open threads and who already reported) it returns the ordered work a tick
//! must perform. [`exec`] loads inputs from a store and applies the
//! resulting work against a store and a chat sender.
//!
//! Phases run in the fixed order [`Phase::ORDER`]: Warn, Remind, Notify.
//! Remind therefore never sees threads opened by the same tick's Notify.

pub mod exec;
mod notify;
mod remind;
mod warn;

pub use exec::{ApplyOutcome, apply_plan, load_input};

use crate::config::WatchConfig;
use crate::deadline::{DeadlineEvaluator, DeadlineTime};
use crate::i18n::{Localizer, MessageKey};
use crate::model::{ChatId, Group, NotificationThread, Standuper, ThreadKey, UserId};
use chrono::{DateTime, Duration, Timelike, Utc};
use chrono_tz::Tz;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error};

/// Tunables shared by every phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    /// Lead time of the pre-deadline warning.
    pub warn_lead: Duration,
    /// Spacing between escalation reminders.
    pub escalation_interval: Duration,
    /// Reminders sent per thread before it is dropped.
    pub max_reminders: u32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from_config(&WatchConfig::default())
    }
}

impl EngineSettings {
    pub fn from_config(config: &WatchConfig) -> Self {
        Self {
            warn_lead: Duration::minutes(i64::from(config.warn_lead_mins)),
            escalation_interval: Duration::minutes(i64::from(config.escalation_interval_mins)),
            max_reminders: config.max_reminders,
        }
    }
}

/// One of the three sequential steps of a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Warn,
    Remind,
    Notify,
}

impl Phase {
    /// Execution order within a tick.
    pub const ORDER: [Phase; 3] = [Phase::Warn, Phase::Remind, Phase::Notify];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Warn => "warn",
            Self::Remind => "remind",
            Self::Notify => "notify",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything a phase reads for one group at one instant.
#[derive(Debug, Clone)]
pub struct TickInput {
    pub group: Group,
    /// Tick instant in the group's zone.
    pub local_now: DateTime<Tz>,
    /// Whether the reporting window is open for this group today.
    pub window_open: bool,
    /// Active standupers of the group.
    pub standupers: Vec<Standuper>,
    /// Open notification threads of the group.
    pub threads: Vec<NotificationThread>,
    /// Submission status per user. A missing entry means the lookup failed;
    /// such users are left alone this tick.
    pub reported: HashMap<UserId, bool>,
}

impl TickInput {
    pub fn reported(&self, user_id: UserId) -> Option<bool> {
        self.reported.get(&user_id).copied()
    }

    /// Active standupers known not to have reported today.
    pub fn non_reporters(&self) -> impl Iterator<Item = &Standuper> {
        self.standupers
            .iter()
            .filter(|s| self.reported(s.user_id) == Some(false))
    }
}

/// Store change requested by a phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    /// Create or reset the thread for its key.
    UpsertThread(NotificationThread),
    UpdateThread(NotificationThread),
    DeleteThread(ThreadKey),
    DeleteChatThreads(ChatId),
}

/// What to do when a message fails because the bot left the chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalPolicy {
    /// Log and carry on.
    Ignore,
    /// Delete the group with its threads and standupers, then stop watching.
    TeardownGroup,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub chat_id: ChatId,
    pub text: String,
    pub on_removed: RemovalPolicy,
}

/// Smallest unit of work. Mutations are applied in order, then the message
/// is sent. A failed mutation abandons the rest of its item only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub phase: Phase,
    pub mutations: Vec<Mutation>,
    pub message: Option<OutboundMessage>,
}

impl WorkItem {
    pub(crate) fn mutation(phase: Phase, mutation: Mutation) -> Self {
        Self {
            phase,
            mutations: vec![mutation],
            message: None,
        }
    }
}

/// Ordered work for one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickPlan {
    pub items: Vec<WorkItem>,
}

impl TickPlan {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Deadline logic with its pluggable grammar and message catalog.
#[derive(Clone)]
pub struct Engine {
    settings: EngineSettings,
    evaluator: Arc<dyn DeadlineEvaluator>,
    localizer: Arc<dyn Localizer>,
}

impl Engine {
    pub fn new(
        settings: EngineSettings,
        evaluator: Arc<dyn DeadlineEvaluator>,
        localizer: Arc<dyn Localizer>,
    ) -> Self {
        Self {
            settings,
            evaluator,
            localizer,
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Work items of one phase, in execution order.
    pub fn plan_phase(&self, phase: Phase, input: &TickInput) -> Vec<WorkItem> {
        match phase {
            Phase::Warn => warn::plan(self, input),
            Phase::Remind => remind::plan(self, input),
            Phase::Notify => notify::plan(self, input),
        }
    }

    /// Cheap pre-check: can `phase` produce work for `group` at `local_now`?
    ///
    /// Lets callers avoid loading a full [`TickInput`] on idle minutes.
    pub fn phase_may_act(
        &self,
        phase: Phase,
        group: &Group,
        local_now: &DateTime<Tz>,
        window_open: bool,
    ) -> bool {
        match phase {
            Phase::Warn => {
                window_open && self.deadline_at(group, local_now, self.settings.warn_lead)
            }
            Phase::Notify => window_open && self.deadline_at(group, local_now, Duration::zero()),
            Phase::Remind => true,
        }
    }

    /// True when `local_now + lead` falls on the group's resolved deadline.
    pub(crate) fn deadline_at(&self, group: &Group, local_now: &DateTime<Tz>, lead: Duration) -> bool {
        let Some(deadline) = self.resolve_deadline(group, local_now) else {
            return false;
        };
        deadline.matches(&(*local_now + lead))
    }

    fn resolve_deadline(&self, group: &Group, local_now: &DateTime<Tz>) -> Option<DeadlineTime> {
        let expression = group.deadline_expression()?;
        let resolved = self
            .evaluator
            .resolve(expression, &group.language, local_now);
        if resolved.is_none() {
            debug!(
                chat_id = group.chat_id,
                expression, "deadline expression not understood"
            );
        }
        resolved
    }

    /// Render a template, logging and returning `None` on failure.
    pub(crate) fn render(
        &self,
        key: MessageKey,
        group: &Group,
        params: &[(&str, &str)],
    ) -> Option<String> {
        match self.localizer.render(key, &group.language, params) {
            Ok(text) => Some(text),
            Err(e) => {
                error!(chat_id = group.chat_id, key = key.id(), "cannot render message: {e}");
                None
            }
        }
    }

    /// Next reminder instant for a thread opened at `local_now`.
    ///
    /// Anchored to the start of the minute so later ticks match it exactly.
    pub(crate) fn first_reminder_at(&self, local_now: &DateTime<Tz>) -> DateTime<Utc> {
        let floor = local_now
            .with_second(0)
            .and_then(|t| t.with_nanosecond(0))
            .unwrap_or_else(|| *local_now);
        (floor + self.settings.escalation_interval).with_timezone(&Utc)
    }
}

/// Evaluate every phase of a tick against one input.
///
/// Pure: no clock, store or transport is touched. All phases see the same
/// input, so the result equals what a tick would do if nothing changed
/// between phases.
pub fn evaluate_tick(input: &TickInput, engine: &Engine) -> TickPlan {
    let items = Phase::ORDER
        .into_iter()
        .flat_map(|phase| engine.plan_phase(phase, input))
        .collect();
    TickPlan { items }
}

/// Sorted, deduplicated `@name` / anonymous mentions with their warning counts.
pub(crate) fn identities<'a>(
    standupers: impl Iterator<Item = &'a Standuper>,
) -> std::collections::BTreeMap<String, u32> {
    standupers
        .map(|s| (s.mention().to_string(), s.warnings))
        .collect()
}
