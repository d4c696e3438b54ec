//! Pre-deadline warning: one group message listing everyone who still owes
//! a standup `warn_lead` before the deadline.

use super::{Engine, OutboundMessage, Phase, RemovalPolicy, TickInput, WorkItem, identities};
use crate::i18n::MessageKey;

pub(super) fn plan(engine: &Engine, input: &TickInput) -> Vec<WorkItem> {
    let lead = engine.settings().warn_lead;
    if !input.window_open || !engine.deadline_at(&input.group, &input.local_now, lead) {
        return Vec::new();
    }

    let missing = identities(input.non_reporters());
    if missing.is_empty() {
        return Vec::new();
    }

    let standupers = missing.keys().cloned().collect::<Vec<_>>().join(", ");
    let minutes = lead.num_minutes().to_string();
    let Some(text) = engine.render(
        MessageKey::WarnNonReporters,
        &input.group,
        &[("standupers", &standupers), ("minutes", &minutes)],
    ) else {
        return Vec::new();
    };

    vec![WorkItem {
        phase: Phase::Warn,
        mutations: Vec::new(),
        message: Some(OutboundMessage {
            chat_id: input.group.chat_id,
            text,
            on_removed: RemovalPolicy::Ignore,
        }),
    }]
}
