//! Persistent state behind the watchers.
//!
//! All cross-group state (groups, standupers, notification threads,
//! submitted standups) lives behind [`StandupStore`]. Implementations must
//! serialize concurrent access themselves: every watcher calls into the same
//! store from its own task.

pub mod memory;
mod schema;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::model::{ChatId, Group, NotificationThread, Standuper, ThreadKey, UserId};
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Timelike, Utc};
use chrono_tz::Tz;

/// Errors from the store backends.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("record not found: {0}")]
    NotFound(String),

    #[error("record already exists: {0}")]
    Conflict(String),

    #[error("lock poisoned: {0}")]
    Lock(String),
}

/// Storage operations used by the watchers and the group feed.
pub trait StandupStore: Send + Sync {
    fn find_group(&self, chat_id: ChatId) -> Result<Option<Group>, StoreError>;

    fn list_groups(&self) -> Result<Vec<Group>, StoreError>;

    /// Insert or replace a group by chat id.
    fn save_group(&self, group: &Group) -> Result<(), StoreError>;

    fn delete_group(&self, chat_id: ChatId) -> Result<(), StoreError>;

    /// Insert a standuper. Fails if one already exists for the (chat, user) pair.
    fn create_standuper(&self, standuper: &Standuper) -> Result<(), StoreError>;

    /// Overwrite username, status, language, warnings and zone of an existing standuper.
    fn update_standuper(&self, standuper: &Standuper) -> Result<(), StoreError>;

    fn find_standuper(
        &self,
        chat_id: ChatId,
        user_id: UserId,
    ) -> Result<Option<Standuper>, StoreError>;

    /// Standupers of `chat_id` whose status is active.
    fn list_active_standupers(&self, chat_id: ChatId) -> Result<Vec<Standuper>, StoreError>;

    fn delete_standuper(&self, chat_id: ChatId, user_id: UserId) -> Result<(), StoreError>;

    fn delete_group_standupers(&self, chat_id: ChatId) -> Result<(), StoreError>;

    /// Create the thread for its (chat, user) key, or reset the existing one
    /// to the given instant and counter. Never produces a second thread.
    fn upsert_thread(&self, thread: &NotificationThread) -> Result<(), StoreError>;

    fn list_threads(&self, chat_id: ChatId) -> Result<Vec<NotificationThread>, StoreError>;

    /// Persist next instant and counter of an existing thread.
    fn update_thread(&self, thread: &NotificationThread) -> Result<(), StoreError>;

    fn delete_thread(&self, key: ThreadKey) -> Result<(), StoreError>;

    fn delete_chat_threads(&self, chat_id: ChatId) -> Result<(), StoreError>;
}

/// Answers whether a standuper already reported today.
pub trait SubmissionOracle: Send + Sync {
    /// `local_now` carries both the instant and the zone that defines "today".
    fn submitted_today(
        &self,
        chat_id: ChatId,
        user_id: UserId,
        local_now: &DateTime<Tz>,
    ) -> Result<bool, StoreError>;
}

/// UTC bounds `[start, end)` of the local calendar day containing `local_now`.
pub fn local_day_bounds(local_now: &DateTime<Tz>) -> (DateTime<Utc>, DateTime<Utc>) {
    let tz = local_now.timezone();
    let today = local_now.date_naive();
    let start = local_midnight(&tz, today).unwrap_or_else(|| {
        let since_midnight = Duration::seconds(i64::from(local_now.num_seconds_from_midnight()));
        local_now.with_timezone(&Utc) - since_midnight
    });
    let end = today
        .succ_opt()
        .and_then(|tomorrow| local_midnight(&tz, tomorrow))
        .unwrap_or(start + Duration::days(1));
    (start, end)
}

fn local_midnight(tz: &Tz, date: NaiveDate) -> Option<DateTime<Utc>> {
    let midnight = date.and_hms_opt(0, 0, 0)?;
    tz.from_local_datetime(&midnight)
        .earliest()
        .map(|t| t.with_timezone(&Utc))
}
