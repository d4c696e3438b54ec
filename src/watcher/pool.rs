//! Registry of running group watchers.
//!
//! The pool consumes a stream of [`WatchRequest`]s and keeps at most one
//! [`GroupWatcher`] per chat. Each watcher task removes its own registry
//! entry when it stops or panics; entries carry a generation number so a
//! finishing watcher never removes a newer registration for the same chat.
//! Watchers that stop on their own are reported on the optional stop channel
//! so the request producer can track the chat again later.

use super::group::{GroupWatcher, WatchContext};
use crate::model::{ChatId, Group};
use futures_util::{Stream, StreamExt};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

/// Request to start or stop watching a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchRequest {
    Track(Group),
    Untrack(ChatId),
}

#[derive(Debug)]
struct Registration {
    generation: u64,
    cancel: CancellationToken,
}

type Registry = Arc<Mutex<HashMap<ChatId, Registration>>>;

/// Owns the per-group watcher tasks.
#[derive(Clone)]
pub struct WatcherPool {
    ctx: Arc<WatchContext>,
    registry: Registry,
    tracker: TaskTracker,
    shutdown: CancellationToken,
    next_generation: Arc<AtomicU64>,
    stopped: Option<mpsc::UnboundedSender<ChatId>>,
}

/// Removes a watcher's registration when its task ends, however it ends.
struct Deregister {
    registry: Registry,
    chat_id: ChatId,
    generation: u64,
    stopped: Option<mpsc::UnboundedSender<ChatId>>,
}

impl Drop for Deregister {
    fn drop(&mut self) {
        let removed = {
            let mut registry = lock(&self.registry);
            let current = registry
                .get(&self.chat_id)
                .is_some_and(|r| r.generation == self.generation);
            if current {
                registry.remove(&self.chat_id);
            }
            current
        };
        if !removed {
            return;
        }
        debug!(chat_id = self.chat_id, "group watcher deregistered");
        if let Some(stopped) = &self.stopped {
            // The receiver is gone once the feed has shut down.
            let _ = stopped.send(self.chat_id);
        }
    }
}

impl WatcherPool {
    pub fn new(ctx: WatchContext) -> Self {
        Self {
            ctx: Arc::new(ctx),
            registry: Arc::new(Mutex::new(HashMap::new())),
            tracker: TaskTracker::new(),
            shutdown: CancellationToken::new(),
            next_generation: Arc::new(AtomicU64::new(1)),
            stopped: None,
        }
    }

    /// Report the chat id of every watcher that stops without an
    /// `Untrack` on `stopped`: group deleted, bot removed, task panicked
    /// or pool shut down.
    pub fn with_stop_notifier(mut self, stopped: mpsc::UnboundedSender<ChatId>) -> Self {
        self.stopped = Some(stopped);
        self
    }

    /// Apply requests until the stream ends, then stop every watcher and
    /// wait for them to finish.
    pub async fn start_watching<S>(&self, requests: S)
    where
        S: Stream<Item = WatchRequest>,
    {
        let mut requests = std::pin::pin!(requests);
        info!("watcher pool started");

        while let Some(request) = requests.next().await {
            match request {
                WatchRequest::Track(group) => {
                    self.track(group);
                }
                WatchRequest::Untrack(chat_id) => {
                    self.untrack(chat_id);
                }
            }
        }

        info!("watch request stream closed");
        self.shutdown().await;
    }

    /// Start a watcher for `group`. Returns `false` when the chat already
    /// has a live watcher; the request is then ignored.
    pub fn track(&self, group: Group) -> bool {
        let chat_id = group.chat_id;
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let cancel = self.shutdown.child_token();
        {
            let mut registry = lock(&self.registry);
            if registry.contains_key(&chat_id) {
                warn!(chat_id, "group already watched, ignoring track request");
                return false;
            }
            registry.insert(
                chat_id,
                Registration {
                    generation,
                    cancel: cancel.clone(),
                },
            );
        }

        let watcher = GroupWatcher::new(group, Arc::clone(&self.ctx), cancel);
        let guard = Deregister {
            registry: Arc::clone(&self.registry),
            chat_id,
            generation,
            stopped: self.stopped.clone(),
        };
        self.tracker.spawn(async move {
            let _guard = guard;
            let state = watcher.run().await;
            debug!(chat_id, ?state, "group watcher finished");
        });
        true
    }

    /// Signal the watcher of `chat_id` to terminate. Returns `false` when
    /// nothing was watching it.
    pub fn untrack(&self, chat_id: ChatId) -> bool {
        match lock(&self.registry).remove(&chat_id) {
            Some(registration) => {
                registration.cancel.cancel();
                info!(chat_id, "group untracked");
                true
            }
            None => {
                debug!(chat_id, "untrack for unwatched group");
                false
            }
        }
    }

    pub fn is_watching(&self, chat_id: ChatId) -> bool {
        lock(&self.registry).contains_key(&chat_id)
    }

    /// Chats with a live watcher, sorted.
    pub fn watched(&self) -> Vec<ChatId> {
        let mut ids: Vec<ChatId> = lock(&self.registry).keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Cancel every watcher and wait for their tasks to end.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        self.tracker.close();
        self.tracker.wait().await;
        lock(&self.registry).clear();
        info!("watcher pool stopped");
    }
}

fn lock(registry: &Registry) -> MutexGuard<'_, HashMap<ChatId, Registration>> {
    registry.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
