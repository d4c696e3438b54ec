//! Behaviour when the bot has been removed from a group.

use crate::helpers::{CHAT, Harness, london};
use standup_nudge::channels::SendError;
use standup_nudge::store::StandupStore;
use standup_nudge::watcher::{StopReason, TickOutcome};

fn kicked() -> SendError {
    SendError::RemovedFromChat {
        chat_id: CHAT,
        reason: "Forbidden: bot was kicked from the group chat".to_owned(),
    }
}

#[tokio::test]
async fn failed_reminder_tears_the_group_down() {
    let mut h = Harness::london(&[(1, Some("alice")), (2, Some("bob"))]);
    h.watcher.tick(london(10, 0)).await;
    assert_eq!(h.store.list_threads(CHAT).unwrap().len(), 2);

    h.sender.fail_with(kicked());
    let outcome = h.watcher.tick(london(10, 30)).await;

    assert_eq!(outcome, TickOutcome::Stop(StopReason::RemovedFromChat));
    assert!(h.store.find_group(CHAT).unwrap().is_none());
    assert!(h.store.list_active_standupers(CHAT).unwrap().is_empty());
    assert!(h.store.list_threads(CHAT).unwrap().is_empty());
}

#[tokio::test]
async fn failed_group_notice_keeps_the_group() {
    let mut h = Harness::london(&[(1, Some("alice"))]);
    h.sender.fail_with(kicked());

    assert_eq!(h.watcher.tick(london(9, 50)).await, TickOutcome::Continue);
    assert_eq!(h.watcher.tick(london(10, 0)).await, TickOutcome::Continue);

    assert!(h.store.find_group(CHAT).unwrap().is_some());
    // The thread was persisted before the notice failed.
    assert_eq!(h.store.list_threads(CHAT).unwrap().len(), 1);
}

#[tokio::test]
async fn generic_failure_during_reminder_is_only_logged() {
    let mut h = Harness::london(&[(1, Some("alice"))]);
    h.watcher.tick(london(10, 0)).await;

    h.sender
        .fail_with(SendError::Failed("telegram 429: Too Many Requests".to_owned()));
    assert_eq!(h.watcher.tick(london(10, 30)).await, TickOutcome::Continue);

    assert!(h.store.find_group(CHAT).unwrap().is_some());
    let threads = h.store.list_threads(CHAT).unwrap();
    // The reminder counts even though delivery failed.
    assert_eq!(threads[0].reminder_counter, 1);
}
