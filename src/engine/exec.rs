//! Loading tick inputs and applying planned work.

use super::{Mutation, Phase, RemovalPolicy, TickInput, TickPlan, WorkItem};
use crate::calendar::ReportingWindow;
use crate::channels::ChatSender;
use crate::model::{ChatId, Group};
use crate::store::{StandupStore, StoreError, SubmissionOracle};
use chrono::DateTime;
use chrono_tz::Tz;
use std::collections::HashMap;
use tracing::{debug, error, info, warn};

/// Result of applying work for one group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Continue,
    /// The bot was removed from the chat and the group was torn down.
    GroupRemoved,
}

/// Read the roster, threads and submission status a phase needs.
///
/// Submission status is looked up for every active standuper when `phase`
/// is Warn or Notify, and only for standupers with an open thread when it
/// is Remind. A failed lookup leaves that user out of `reported`.
pub fn load_input(
    store: &dyn StandupStore,
    oracle: &dyn SubmissionOracle,
    window: &dyn ReportingWindow,
    group: &Group,
    local_now: DateTime<Tz>,
    phase: Phase,
) -> Result<TickInput, StoreError> {
    let chat_id = group.chat_id;
    let standupers = store.list_active_standupers(chat_id)?;
    let threads = store.list_threads(chat_id)?;

    let mut reported = HashMap::new();
    for standuper in &standupers {
        let needed = match phase {
            Phase::Remind => threads.iter().any(|t| t.user_id == standuper.user_id),
            Phase::Warn | Phase::Notify => true,
        };
        if !needed {
            continue;
        }
        match oracle.submitted_today(chat_id, standuper.user_id, &local_now) {
            Ok(done) => {
                reported.insert(standuper.user_id, done);
            }
            Err(e) => warn!(
                chat_id,
                user_id = standuper.user_id,
                "submission lookup failed: {e}"
            ),
        }
    }

    Ok(TickInput {
        group: group.clone(),
        window_open: window.is_open(group, &local_now),
        local_now,
        standupers,
        threads,
        reported,
    })
}

/// Apply a plan item by item. Stops early if the group was torn down.
pub async fn apply_plan(
    plan: TickPlan,
    store: &dyn StandupStore,
    sender: &dyn ChatSender,
) -> ApplyOutcome {
    apply_items(plan.items, store, sender).await
}

pub(crate) async fn apply_items(
    items: Vec<WorkItem>,
    store: &dyn StandupStore,
    sender: &dyn ChatSender,
) -> ApplyOutcome {
    for item in items {
        if apply_item(item, store, sender).await == ApplyOutcome::GroupRemoved {
            return ApplyOutcome::GroupRemoved;
        }
    }
    ApplyOutcome::Continue
}

async fn apply_item(
    item: WorkItem,
    store: &dyn StandupStore,
    sender: &dyn ChatSender,
) -> ApplyOutcome {
    let phase = item.phase.as_str();
    for mutation in &item.mutations {
        if let Err(e) = apply_mutation(store, mutation) {
            error!(phase, ?mutation, "store update failed, skipping work item: {e}");
            return ApplyOutcome::Continue;
        }
    }

    let Some(message) = item.message else {
        return ApplyOutcome::Continue;
    };

    match sender.send(message.chat_id, &message.text).await {
        Ok(()) => {
            debug!(phase, chat_id = message.chat_id, "message sent");
            ApplyOutcome::Continue
        }
        Err(e) if e.is_removed_from_chat() && message.on_removed == RemovalPolicy::TeardownGroup => {
            warn!(phase, chat_id = message.chat_id, "bot removed from chat: {e}");
            teardown_group(store, message.chat_id);
            ApplyOutcome::GroupRemoved
        }
        Err(e) => {
            error!(phase, chat_id = message.chat_id, "message delivery failed: {e}");
            ApplyOutcome::Continue
        }
    }
}

fn apply_mutation(store: &dyn StandupStore, mutation: &Mutation) -> Result<(), StoreError> {
    match mutation {
        Mutation::UpsertThread(thread) => store.upsert_thread(thread),
        Mutation::UpdateThread(thread) => store.update_thread(thread),
        Mutation::DeleteThread(key) => store.delete_thread(*key),
        Mutation::DeleteChatThreads(chat_id) => store.delete_chat_threads(*chat_id),
    }
}

/// Forget everything about a chat the bot can no longer post to.
fn teardown_group(store: &dyn StandupStore, chat_id: ChatId) {
    if let Err(e) = store.delete_chat_threads(chat_id) {
        error!(chat_id, "cannot delete threads of removed group: {e}");
    }
    if let Err(e) = store.delete_group_standupers(chat_id) {
        error!(chat_id, "cannot delete standupers of removed group: {e}");
    }
    match store.delete_group(chat_id) {
        Ok(()) => info!(chat_id, "removed group deleted"),
        Err(e) => error!(chat_id, "cannot delete removed group: {e}"),
    }
}
