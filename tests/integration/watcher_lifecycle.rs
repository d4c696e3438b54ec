//! Pool and watcher lifecycle under paused tokio time.

use crate::helpers::{CHAT, RecordingSender, engine, london};
use standup_nudge::calendar::{AlwaysOpen, ManualClock};
use standup_nudge::model::{Group, Standuper};
use standup_nudge::store::{MemoryStore, StandupStore};
use standup_nudge::watcher::{GroupFeed, WatchRequest};
use standup_nudge::{WatchContext, WatcherPool};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

struct Fixture {
    store: Arc<MemoryStore>,
    sender: Arc<RecordingSender>,
    clock: Arc<ManualClock>,
    pool: WatcherPool,
}

fn fixture() -> Fixture {
    let store = Arc::new(MemoryStore::new());
    let sender = Arc::new(RecordingSender::default());
    let clock = Arc::new(ManualClock::new(london(9, 59)));
    let ctx = WatchContext::new(engine(), store.clone(), store.clone(), sender.clone())
        .with_window(Arc::new(AlwaysOpen))
        .with_clock(clock.clone());
    Fixture {
        store,
        sender,
        clock,
        pool: WatcherPool::new(ctx),
    }
}

fn seed_group(store: &MemoryStore, chat_id: i64) -> Group {
    let group = Group::new(chat_id, "team")
        .with_tz("Europe/London")
        .with_deadline("10:00");
    store.save_group(&group).unwrap();
    store
        .create_standuper(&Standuper::new(chat_id, 1, Some("alice".to_owned())))
        .unwrap();
    group
}

#[tokio::test(start_paused = true)]
async fn watchers_tick_every_minute_per_group() {
    let f = fixture();
    let first = seed_group(&f.store, CHAT);
    let second = seed_group(&f.store, CHAT - 1);
    assert!(f.pool.track(first));
    assert!(f.pool.track(second));

    // First tick lands one interval after start: 09:59, nothing due.
    tokio::time::sleep(Duration::from_secs(61)).await;
    assert!(f.sender.sent().is_empty());

    f.clock.set(london(10, 0));
    tokio::time::sleep(Duration::from_secs(60)).await;
    let mut chats: Vec<i64> = f.sender.sent().into_iter().map(|(chat, _)| chat).collect();
    chats.sort_unstable();
    assert_eq!(chats, vec![CHAT - 1, CHAT]);

    f.pool.shutdown().await;
    assert!(f.pool.watched().is_empty());
}

#[tokio::test(start_paused = true)]
async fn deleted_group_watcher_stops_itself() {
    let f = fixture();
    let group = seed_group(&f.store, CHAT);
    f.pool.track(group);
    assert!(f.pool.is_watching(CHAT));

    f.store.delete_group(CHAT).unwrap();
    tokio::time::sleep(Duration::from_secs(61)).await;
    assert!(!f.pool.is_watching(CHAT));

    f.pool.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn untracked_group_gets_no_more_messages() {
    let f = fixture();
    let group = seed_group(&f.store, CHAT);
    f.pool.track(group);
    assert!(f.pool.untrack(CHAT));

    f.clock.set(london(10, 0));
    tokio::time::sleep(Duration::from_secs(121)).await;
    assert!(f.sender.sent().is_empty());

    f.pool.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn feed_drives_the_pool_until_cancelled() {
    let f = fixture();
    seed_group(&f.store, CHAT);
    let cancel = CancellationToken::new();
    let requests = GroupFeed::new(f.store.clone(), Duration::from_secs(30)).spawn(cancel.clone());

    let pool = f.pool.clone();
    let watching = tokio::spawn(async move { pool.start_watching(requests).await });

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(f.pool.watched(), vec![CHAT]);

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(5), watching)
        .await
        .expect("pool stops once the feed ends")
        .expect("pool task");
    assert!(f.pool.watched().is_empty());
}

#[tokio::test(start_paused = true)]
async fn repeated_track_requests_keep_one_watcher() {
    let f = fixture();
    let group = seed_group(&f.store, CHAT);
    let requests = futures_util::stream::iter(vec![
        WatchRequest::Track(group.clone()),
        WatchRequest::Track(group),
    ]);

    // A second, duplicate track must not double the messages.
    let pool = f.pool.clone();
    let watching = tokio::spawn(async move {
        pool.start_watching(futures_util::StreamExt::chain(
            requests,
            futures_util::stream::pending(),
        ))
        .await
    });

    f.clock.set(london(10, 0));
    tokio::time::sleep(Duration::from_secs(61)).await;
    assert_eq!(f.sender.sent().len(), 1);

    watching.abort();
    f.pool.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn recreated_group_is_watched_again_after_self_stop() {
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::new(london(9, 0)));
    let ctx = WatchContext::new(
        engine(),
        store.clone(),
        store.clone(),
        Arc::new(RecordingSender::default()),
    )
    .with_window(Arc::new(AlwaysOpen))
    .with_clock(clock);
    let (stopped_tx, stopped_rx) = mpsc::unbounded_channel();
    let pool = WatcherPool::new(ctx).with_stop_notifier(stopped_tx);

    let group = seed_group(&store, CHAT);
    let cancel = CancellationToken::new();
    let requests = GroupFeed::new(store.clone(), Duration::from_secs(300))
        .with_stop_events(stopped_rx)
        .spawn(cancel.clone());
    let watching = tokio::spawn({
        let pool = pool.clone();
        async move { pool.start_watching(requests).await }
    });

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(pool.is_watching(CHAT));

    // Gone at the watcher's first tick, back before the feed polls again.
    store.delete_group(CHAT).unwrap();
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert!(!pool.is_watching(CHAT));
    store.save_group(&group).unwrap();

    tokio::time::sleep(Duration::from_secs(240)).await;
    assert!(pool.is_watching(CHAT));

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(5), watching)
        .await
        .expect("pool stops once the feed ends")
        .expect("pool task");
}
