//! Deadline reached: open an escalation thread for every non-reporter and
//! tell the group who missed it.

use super::{
    Engine, Mutation, OutboundMessage, Phase, RemovalPolicy, TickInput, WorkItem, identities,
};
use crate::i18n::MessageKey;
use crate::model::NotificationThread;
use chrono::Duration;

pub(super) fn plan(engine: &Engine, input: &TickInput) -> Vec<WorkItem> {
    if !input.window_open || !engine.deadline_at(&input.group, &input.local_now, Duration::zero())
    {
        return Vec::new();
    }

    let next = engine.first_reminder_at(&input.local_now);
    let mut items: Vec<WorkItem> = input
        .non_reporters()
        .map(|s| {
            WorkItem::mutation(
                Phase::Notify,
                Mutation::UpsertThread(NotificationThread::open(s, next)),
            )
        })
        .collect();
    if items.is_empty() {
        return items;
    }

    let missing = identities(input.non_reporters());
    let standupers = missing.keys().cloned().collect::<Vec<_>>().join(", ");
    if let Some(text) = engine.render(
        MessageKey::NotifyNonReporters,
        &input.group,
        &[("standupers", &standupers)],
    ) {
        items.push(WorkItem {
            phase: Phase::Notify,
            mutations: Vec::new(),
            message: Some(OutboundMessage {
                chat_id: input.group.chat_id,
                text,
                on_removed: RemovalPolicy::Ignore,
            }),
        });
    }
    items
}
