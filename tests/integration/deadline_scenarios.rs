//! End-to-end deadline behaviour driven tick by tick against SQLite.

use crate::helpers::{CHAT, Harness, london};
use chrono::{Duration, TimeZone, Utc};
use standup_nudge::store::StandupStore;
use standup_nudge::watcher::TickOutcome;

#[tokio::test]
async fn warn_miss_remind_then_report_closes_thread() {
    let mut h = Harness::london(&[(1, Some("alice"))]);

    // 09:50: ten-minute warning naming alice.
    assert_eq!(h.watcher.tick(london(9, 50)).await, TickOutcome::Continue);
    let texts = h.sender.texts();
    assert_eq!(texts.len(), 1);
    assert!(texts[0].contains("@alice"));
    assert!(texts[0].contains("10"));
    h.sender.clear();

    // Quiet minute in between.
    h.watcher.tick(london(9, 55)).await;
    assert!(h.sender.sent().is_empty());

    // 10:00: deadline missed, thread opened for 10:30.
    h.watcher.tick(london(10, 0)).await;
    let texts = h.sender.texts();
    assert_eq!(texts.len(), 1);
    assert!(texts[0].contains("missed the deadline"));
    let threads = h.store.list_threads(CHAT).unwrap();
    assert_eq!(threads.len(), 1);
    assert_eq!(threads[0].next_reminder_at, london(10, 30));
    assert_eq!(threads[0].reminder_counter, 0);
    h.sender.clear();

    // 10:30: first reminder, thread advanced to 11:00.
    h.watcher.tick(london(10, 30)).await;
    let texts = h.sender.texts();
    assert_eq!(texts.len(), 1);
    assert!(texts[0].contains("@alice"));
    assert!(texts[0].contains("haven't written a standup"));
    let threads = h.store.list_threads(CHAT).unwrap();
    assert_eq!(threads[0].next_reminder_at, london(11, 0));
    assert_eq!(threads[0].reminder_counter, 1);
    h.sender.clear();

    // alice reports at 10:45; the 11:00 tick closes the thread silently.
    h.report(1, london(10, 45));
    h.watcher.tick(london(11, 0)).await;
    assert!(h.sender.sent().is_empty());
    assert!(h.store.list_threads(CHAT).unwrap().is_empty());
}

#[tokio::test]
async fn reporters_are_left_out_of_group_messages() {
    let mut h = Harness::london(&[(1, Some("alice")), (2, Some("bob")), (3, None)]);
    h.report(2, london(8, 15));

    h.watcher.tick(london(10, 0)).await;
    let texts = h.sender.texts();
    assert_eq!(texts.len(), 1);
    assert!(texts[0].contains("@alice"));
    assert!(texts[0].contains("[stranger](tg://user?id=3)"));
    assert!(!texts[0].contains("@bob"));
    assert_eq!(h.store.list_threads(CHAT).unwrap().len(), 2);
}

#[tokio::test]
async fn everyone_reported_means_silence() {
    let mut h = Harness::london(&[(1, Some("alice"))]);
    h.report(1, london(9, 0));

    h.watcher.tick(london(9, 50)).await;
    h.watcher.tick(london(10, 0)).await;
    assert!(h.sender.sent().is_empty());
    assert!(h.store.list_threads(CHAT).unwrap().is_empty());
}

#[tokio::test]
async fn reminders_stop_at_the_ceiling() {
    let mut h = Harness::london(&[(1, Some("alice"))]);
    h.watcher.tick(london(10, 0)).await;
    h.sender.clear();

    for (hour, minute) in [(10, 30), (11, 0), (11, 30)] {
        h.watcher.tick(london(hour, minute)).await;
    }
    assert_eq!(h.sender.sent().len(), 3);
    assert_eq!(h.store.list_threads(CHAT).unwrap()[0].reminder_counter, 3);
    h.sender.clear();

    h.watcher.tick(london(12, 0)).await;
    assert!(h.sender.sent().is_empty());
    assert!(h.store.list_threads(CHAT).unwrap().is_empty());
}

#[tokio::test]
async fn clearing_the_deadline_drops_open_threads() {
    let mut h = Harness::london(&[(1, Some("alice")), (2, Some("bob"))]);
    h.watcher.tick(london(10, 0)).await;
    assert_eq!(h.store.list_threads(CHAT).unwrap().len(), 2);

    h.update_group(|g| g.with_deadline(""));
    h.sender.clear();
    h.watcher.tick(london(10, 7)).await;

    assert!(h.store.list_threads(CHAT).unwrap().is_empty());
    assert!(h.sender.sent().is_empty());
}

#[tokio::test]
async fn deactivated_standuper_loses_thread() {
    let mut h = Harness::london(&[(1, Some("alice"))]);
    h.watcher.tick(london(10, 0)).await;

    let mut alice = h.store.find_standuper(CHAT, 1).unwrap().unwrap();
    alice.status = standup_nudge::model::StanduperStatus::Inactive;
    h.store.update_standuper(&alice).unwrap();

    h.watcher.tick(london(10, 1)).await;
    assert!(h.store.list_threads(CHAT).unwrap().is_empty());
}

#[tokio::test]
async fn weekend_is_outside_the_reporting_window() {
    let mut h = Harness::london(&[(1, Some("alice"))]);
    let saturday = chrono_tz::Europe::London
        .with_ymd_and_hms(2024, 3, 9, 10, 0, 0)
        .unwrap()
        .with_timezone(&Utc);

    h.watcher.tick(saturday - Duration::minutes(10)).await;
    h.watcher.tick(saturday).await;
    assert!(h.sender.sent().is_empty());
    assert!(h.store.list_threads(CHAT).unwrap().is_empty());
}

#[tokio::test]
async fn reminder_runs_before_notify_in_the_same_minute() {
    let mut h = Harness::london(&[(1, Some("alice"))]);

    // Yesterday's thread is due at 10:00 local, the same minute as the deadline.
    h.watcher.tick(london(10, 0) - Duration::days(3)).await;
    let mut thread = h.store.list_threads(CHAT).unwrap().remove(0);
    thread.next_reminder_at = london(10, 0) - Duration::days(1);
    h.store.update_thread(&thread).unwrap();
    h.sender.clear();

    h.watcher.tick(london(10, 0)).await;
    let texts = h.sender.texts();
    assert_eq!(texts.len(), 2);
    assert!(texts[0].contains("haven't written a standup"));
    assert!(texts[1].contains("missed the deadline"));

    // Notify reset the thread after Remind advanced it.
    let threads = h.store.list_threads(CHAT).unwrap();
    assert_eq!(threads.len(), 1);
    assert_eq!(threads[0].reminder_counter, 0);
    assert_eq!(threads[0].next_reminder_at, london(10, 30));
}

#[tokio::test]
async fn deadline_in_russian_with_russian_messages() {
    let mut h = Harness::london(&[(1, Some("ivan"))]);
    h.update_group(|g| g.with_language("ru").with_deadline("в 10:00"));

    h.watcher.tick(london(10, 0)).await;
    let texts = h.sender.texts();
    assert_eq!(texts.len(), 1);
    assert!(texts[0].starts_with("Внимание, @ivan!"));
}
