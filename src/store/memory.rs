//! In-memory store.
//!
//! Keeps everything in ordered maps behind one `Mutex`. Used by tests and by
//! embedders that persist state elsewhere.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use chrono::DateTime;
use chrono_tz::Tz;

use super::{StandupStore, StoreError, SubmissionOracle, local_day_bounds};
use crate::model::{ChatId, Group, NotificationThread, Standup, Standuper, ThreadKey, UserId};

#[derive(Debug, Default)]
struct MemoryState {
    groups: BTreeMap<ChatId, Group>,
    standupers: BTreeMap<(ChatId, UserId), Standuper>,
    threads: BTreeMap<ThreadKey, NotificationThread>,
    standups: Vec<Standup>,
}

/// Store backed by process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a submitted standup.
    pub fn record_standup(&self, standup: Standup) -> Result<(), StoreError> {
        self.lock()?.standups.push(standup);
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, StoreError> {
        self.state
            .lock()
            .map_err(|e| StoreError::Lock(e.to_string()))
    }
}

impl StandupStore for MemoryStore {
    fn find_group(&self, chat_id: ChatId) -> Result<Option<Group>, StoreError> {
        Ok(self.lock()?.groups.get(&chat_id).cloned())
    }

    fn list_groups(&self) -> Result<Vec<Group>, StoreError> {
        Ok(self.lock()?.groups.values().cloned().collect())
    }

    fn save_group(&self, group: &Group) -> Result<(), StoreError> {
        self.lock()?.groups.insert(group.chat_id, group.clone());
        Ok(())
    }

    fn delete_group(&self, chat_id: ChatId) -> Result<(), StoreError> {
        self.lock()?.groups.remove(&chat_id);
        Ok(())
    }

    fn create_standuper(&self, standuper: &Standuper) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        let key = (standuper.chat_id, standuper.user_id);
        if state.standupers.contains_key(&key) {
            return Err(StoreError::Conflict(format!(
                "standuper {} already exists in chat {}",
                standuper.user_id, standuper.chat_id
            )));
        }
        state.standupers.insert(key, standuper.clone());
        Ok(())
    }

    fn update_standuper(&self, standuper: &Standuper) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        let existing = state
            .standupers
            .get_mut(&(standuper.chat_id, standuper.user_id))
            .ok_or_else(|| {
                StoreError::NotFound(format!(
                    "standuper {} in chat {}",
                    standuper.user_id, standuper.chat_id
                ))
            })?;
        existing.username = standuper.username.clone();
        existing.status = standuper.status;
        existing.language_code = standuper.language_code.clone();
        existing.warnings = standuper.warnings;
        existing.tz = standuper.tz.clone();
        Ok(())
    }

    fn find_standuper(
        &self,
        chat_id: ChatId,
        user_id: UserId,
    ) -> Result<Option<Standuper>, StoreError> {
        Ok(self.lock()?.standupers.get(&(chat_id, user_id)).cloned())
    }

    fn list_active_standupers(&self, chat_id: ChatId) -> Result<Vec<Standuper>, StoreError> {
        Ok(self
            .lock()?
            .standupers
            .range((chat_id, UserId::MIN)..=(chat_id, UserId::MAX))
            .map(|(_, s)| s)
            .filter(|s| s.is_active())
            .cloned()
            .collect())
    }

    fn delete_standuper(&self, chat_id: ChatId, user_id: UserId) -> Result<(), StoreError> {
        self.lock()?.standupers.remove(&(chat_id, user_id));
        Ok(())
    }

    fn delete_group_standupers(&self, chat_id: ChatId) -> Result<(), StoreError> {
        self.lock()?
            .standupers
            .retain(|(chat, _), _| *chat != chat_id);
        Ok(())
    }

    fn upsert_thread(&self, thread: &NotificationThread) -> Result<(), StoreError> {
        self.lock()?.threads.insert(thread.key(), thread.clone());
        Ok(())
    }

    fn list_threads(&self, chat_id: ChatId) -> Result<Vec<NotificationThread>, StoreError> {
        Ok(self
            .lock()?
            .threads
            .values()
            .filter(|t| t.chat_id == chat_id)
            .cloned()
            .collect())
    }

    fn update_thread(&self, thread: &NotificationThread) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        let existing = state
            .threads
            .get_mut(&thread.key())
            .ok_or_else(|| {
                StoreError::NotFound(format!(
                    "thread for user {} in chat {}",
                    thread.user_id, thread.chat_id
                ))
            })?;
        existing.next_reminder_at = thread.next_reminder_at;
        existing.reminder_counter = thread.reminder_counter;
        Ok(())
    }

    fn delete_thread(&self, key: ThreadKey) -> Result<(), StoreError> {
        self.lock()?.threads.remove(&key);
        Ok(())
    }

    fn delete_chat_threads(&self, chat_id: ChatId) -> Result<(), StoreError> {
        self.lock()?.threads.retain(|key, _| key.chat_id != chat_id);
        Ok(())
    }
}

impl SubmissionOracle for MemoryStore {
    fn submitted_today(
        &self,
        chat_id: ChatId,
        user_id: UserId,
        local_now: &DateTime<Tz>,
    ) -> Result<bool, StoreError> {
        let (start, end) = local_day_bounds(local_now);
        Ok(self.lock()?.standups.iter().any(|s| {
            s.chat_id == chat_id && s.user_id == user_id && s.created >= start && s.created < end
        }))
    }
}
