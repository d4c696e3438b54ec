//! Store-backed source of [`WatchRequest`]s.
//!
//! [`GroupFeed`] polls the store for groups and emits `Track` for chats it
//! has not seen yet and `Untrack` for chats that vanished since the last
//! poll. The stream ends when the feed is cancelled.
//!
//! Chats whose watcher stopped on its own arrive on the optional stop
//! channel and are forgotten, so a group that reappears is tracked again.

use super::pool::WatchRequest;
use crate::model::{ChatId, Group};
use crate::store::StandupStore;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub struct GroupFeed {
    store: Arc<dyn StandupStore>,
    poll_interval: Duration,
    stopped: Option<mpsc::UnboundedReceiver<ChatId>>,
}

impl GroupFeed {
    pub fn new(store: Arc<dyn StandupStore>, poll_interval: Duration) -> Self {
        Self {
            store,
            poll_interval: poll_interval.max(Duration::from_secs(1)),
            stopped: None,
        }
    }

    /// Forget chats received on `stopped`; pair with
    /// [`WatcherPool::with_stop_notifier`](super::WatcherPool::with_stop_notifier).
    pub fn with_stop_events(mut self, stopped: mpsc::UnboundedReceiver<ChatId>) -> Self {
        self.stopped = Some(stopped);
        self
    }

    /// Start polling in a background task and return the request stream.
    ///
    /// The first poll happens immediately.
    pub fn spawn(mut self, cancel: CancellationToken) -> UnboundedReceiverStream<WatchRequest> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut stopped = self.stopped.take();
        tokio::spawn(async move {
            let mut known = BTreeSet::new();
            let mut interval = tokio::time::interval(self.poll_interval);
            info!("group feed started");

            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        info!("group feed cancelled");
                        break;
                    }
                    Some(chat_id) = next_stop(&mut stopped) => {
                        debug!(chat_id, "watcher stopped, forgetting group");
                        known.remove(&chat_id);
                    }
                    _ = interval.tick() => {
                        let groups = match self.store.list_groups() {
                            Ok(groups) => groups,
                            Err(e) => {
                                warn!("cannot list groups: {e}");
                                continue;
                            }
                        };
                        let requests = diff(&mut known, groups);
                        if !requests.is_empty() {
                            debug!(count = requests.len(), "group feed changes");
                        }
                        if requests.into_iter().any(|r| tx.send(r).is_err()) {
                            debug!("watch request receiver dropped, stopping feed");
                            break;
                        }
                    }
                }
            }
        });
        UnboundedReceiverStream::new(rx)
    }
}

async fn next_stop(stopped: &mut Option<mpsc::UnboundedReceiver<ChatId>>) -> Option<ChatId> {
    match stopped {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

/// Requests that bring `known` in line with `groups`, updating `known`.
pub(crate) fn diff(known: &mut BTreeSet<ChatId>, groups: Vec<Group>) -> Vec<WatchRequest> {
    let current: BTreeSet<ChatId> = groups.iter().map(|g| g.chat_id).collect();

    let mut requests: Vec<WatchRequest> = known
        .difference(&current)
        .map(|id| WatchRequest::Untrack(*id))
        .collect();
    requests.extend(
        groups
            .into_iter()
            .filter(|g| !known.contains(&g.chat_id))
            .map(WatchRequest::Track),
    );

    *known = current;
    requests
}
