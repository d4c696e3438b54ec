//! Per-group watcher loop.
//!
//! [`GroupWatcher`] ticks on a fixed interval and, on every tick, runs the
//! Warn, Remind and Notify phases for its group. It stops when its
//! cancellation token fires, when the group record disappears, or when the
//! bot turns out to have been removed from the chat.

use crate::calendar::{Clock, ReportingWindow, SystemClock, WorkingDays};
use crate::channels::ChatSender;
use crate::engine::exec::apply_items;
use crate::engine::{ApplyOutcome, Engine, Phase, load_input};
use crate::model::{ChatId, Group};
use crate::store::{StandupStore, SubmissionOracle};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Collaborators shared by every watcher in a pool.
#[derive(Clone)]
pub struct WatchContext {
    pub engine: Engine,
    pub store: Arc<dyn StandupStore>,
    pub oracle: Arc<dyn SubmissionOracle>,
    pub sender: Arc<dyn ChatSender>,
    pub window: Arc<dyn ReportingWindow>,
    pub clock: Arc<dyn Clock>,
    /// Time between ticks.
    pub tick_interval: Duration,
    /// Evaluate groups with an invalid zone in UTC instead of skipping them.
    pub utc_fallback: bool,
}

impl WatchContext {
    /// Context with Mon-Fri working days, the system clock and 60 s ticks.
    pub fn new(
        engine: Engine,
        store: Arc<dyn StandupStore>,
        oracle: Arc<dyn SubmissionOracle>,
        sender: Arc<dyn ChatSender>,
    ) -> Self {
        Self {
            engine,
            store,
            oracle,
            sender,
            window: Arc::new(WorkingDays::default()),
            clock: Arc::new(SystemClock),
            tick_interval: Duration::from_secs(60),
            utc_fallback: true,
        }
    }

    pub fn with_window(mut self, window: Arc<dyn ReportingWindow>) -> Self {
        self.window = window;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Override the tick interval. Zero is clamped to one second.
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval.max(Duration::from_secs(1));
        self
    }

    pub fn with_utc_fallback(mut self, enabled: bool) -> Self {
        self.utc_fallback = enabled;
        self
    }
}

/// Lifecycle of a watcher. `Stopped` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherState {
    Running,
    Stopped,
}

/// Why a watcher stopped on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The group record is gone from the store.
    GroupDeleted,
    /// The bot was removed from the chat; the group was torn down.
    RemovedFromChat,
}

/// Result of one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Continue,
    Stop(StopReason),
}

/// Watches one group until cancelled or the group goes away.
pub struct GroupWatcher {
    group: Group,
    ctx: Arc<WatchContext>,
    cancel: CancellationToken,
    state: WatcherState,
}

impl GroupWatcher {
    pub fn new(group: Group, ctx: Arc<WatchContext>, cancel: CancellationToken) -> Self {
        Self {
            group,
            ctx,
            cancel,
            state: WatcherState::Running,
        }
    }

    pub fn chat_id(&self) -> ChatId {
        self.group.chat_id
    }

    pub fn state(&self) -> WatcherState {
        self.state
    }

    /// Last group record seen by this watcher.
    pub fn group(&self) -> &Group {
        &self.group
    }

    /// Tick until cancelled or stopped. Cancellation is only observed
    /// between ticks; a tick in progress always completes.
    pub async fn run(mut self) -> WatcherState {
        let chat_id = self.chat_id();
        let period = self.ctx.tick_interval;
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(chat_id, title = %self.group.title, "group watcher started");

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    info!(chat_id, "group watcher cancelled");
                    break;
                }
                _ = interval.tick() => {
                    let now = self.ctx.clock.now();
                    if let TickOutcome::Stop(reason) = self.tick(now).await {
                        info!(chat_id, ?reason, "group watcher stopping");
                        break;
                    }
                }
            }
        }

        self.state = WatcherState::Stopped;
        self.state
    }

    /// Run one tick at `now`.
    pub async fn tick(&mut self, now: DateTime<Utc>) -> TickOutcome {
        if self.state == WatcherState::Stopped {
            return TickOutcome::Stop(StopReason::GroupDeleted);
        }
        let chat_id = self.chat_id();
        let ctx = Arc::clone(&self.ctx);

        match ctx.store.find_group(chat_id) {
            Ok(Some(group)) => self.group = group,
            Ok(None) => {
                self.state = WatcherState::Stopped;
                return TickOutcome::Stop(StopReason::GroupDeleted);
            }
            Err(e) => warn!(chat_id, "cannot refresh group, using last known record: {e}"),
        }

        let Some(tz) = self.resolve_zone() else {
            return TickOutcome::Continue;
        };
        let local_now = now.with_timezone(&tz);
        let window_open = ctx.window.is_open(&self.group, &local_now);

        for phase in Phase::ORDER {
            if !ctx
                .engine
                .phase_may_act(phase, &self.group, &local_now, window_open)
            {
                continue;
            }

            let input = match load_input(
                ctx.store.as_ref(),
                ctx.oracle.as_ref(),
                ctx.window.as_ref(),
                &self.group,
                local_now,
                phase,
            ) {
                Ok(input) => input,
                Err(e) => {
                    error!(chat_id, %phase, "cannot load phase input: {e}");
                    continue;
                }
            };

            let items = ctx.engine.plan_phase(phase, &input);
            if items.is_empty() {
                continue;
            }
            debug!(chat_id, %phase, items = items.len(), "applying phase work");

            if apply_items(items, ctx.store.as_ref(), ctx.sender.as_ref()).await
                == ApplyOutcome::GroupRemoved
            {
                self.state = WatcherState::Stopped;
                return TickOutcome::Stop(StopReason::RemovedFromChat);
            }
        }

        TickOutcome::Continue
    }

    fn resolve_zone(&self) -> Option<Tz> {
        match self.group.tz.trim().parse::<Tz>() {
            Ok(tz) => Some(tz),
            Err(_) if self.ctx.utc_fallback => {
                error!(
                    chat_id = self.chat_id(),
                    tz = %self.group.tz,
                    "invalid time zone, evaluating in UTC"
                );
                Some(Tz::UTC)
            }
            Err(_) => {
                error!(
                    chat_id = self.chat_id(),
                    tz = %self.group.tz,
                    "invalid time zone, skipping tick"
                );
                None
            }
        }
    }
}
