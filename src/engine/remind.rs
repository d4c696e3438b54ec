//! Escalation: advance due threads and remind their standupers, dropping
//! threads that are finished.

use super::{Engine, Mutation, OutboundMessage, Phase, RemovalPolicy, TickInput, WorkItem};
use crate::i18n::MessageKey;
use crate::model::UserId;
use chrono::Timelike;
use std::collections::HashSet;

pub(super) fn plan(engine: &Engine, input: &TickInput) -> Vec<WorkItem> {
    let chat_id = input.group.chat_id;

    if input.group.deadline_expression().is_none() {
        if input.threads.is_empty() {
            return Vec::new();
        }
        return vec![WorkItem::mutation(
            Phase::Remind,
            Mutation::DeleteChatThreads(chat_id),
        )];
    }

    let active: HashSet<UserId> = input.standupers.iter().map(|s| s.user_id).collect();
    let settings = engine.settings();
    let tz = input.local_now.timezone();
    let mut items = Vec::new();

    for thread in &input.threads {
        let drop_thread = WorkItem::mutation(Phase::Remind, Mutation::DeleteThread(thread.key()));

        if !active.contains(&thread.user_id) {
            items.push(drop_thread);
            continue;
        }

        let due = thread.next_reminder_at.with_timezone(&tz);
        if due.hour() != input.local_now.hour() || due.minute() != input.local_now.minute() {
            continue;
        }

        if thread.reminder_counter >= settings.max_reminders {
            items.push(drop_thread);
            continue;
        }

        match input.reported(thread.user_id) {
            Some(true) => {
                items.push(drop_thread);
                continue;
            }
            Some(false) => {}
            None => continue,
        }

        let mut advanced = thread.clone();
        advanced.next_reminder_at += settings.escalation_interval;
        advanced.reminder_counter += 1;

        let mention = thread.mention().to_string();
        let message = engine
            .render(
                MessageKey::RemindNonReporter,
                &input.group,
                &[("standuper", &mention)],
            )
            .map(|text| OutboundMessage {
                chat_id,
                text,
                on_removed: RemovalPolicy::TeardownGroup,
            });

        items.push(WorkItem {
            phase: Phase::Remind,
            mutations: vec![Mutation::UpdateThread(advanced)],
            message,
        });
    }

    items
}
