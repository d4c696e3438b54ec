//! SQLite-backed standup store.
//!
//! Thread-safe via an internal `Mutex<Connection>`; every call holds the
//! lock for one statement, so watchers of different groups never interleave
//! partial writes.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use rusqlite::{Connection, OptionalExtension, params};

use super::schema::{apply_schema, read_schema_version};
use super::{StandupStore, StoreError, SubmissionOracle, local_day_bounds};
use crate::model::{
    ChatId, Group, NotificationThread, Standup, Standuper, StanduperStatus, ThreadKey, UserId,
};

const STANDUPER_COLUMNS: &str =
    "chat_id, user_id, username, language_code, tz, warnings, status, created_at";

/// SQLite standup store.
pub struct SqliteStore {
    path: Option<PathBuf>,
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database at `path` and apply the schema.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::Io(e.to_string()))?;
        }
        let conn = Connection::open(path)?;
        apply_schema(&conn)?;
        Ok(Self {
            path: Some(path.to_path_buf()),
            conn: Mutex::new(conn),
        })
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        apply_schema(&conn)?;
        Ok(Self {
            path: None,
            conn: Mutex::new(conn),
        })
    }

    /// Database file path, `None` for in-memory stores.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn schema_version(&self) -> Result<Option<u32>, StoreError> {
        let conn = self.lock()?;
        Ok(read_schema_version(&conn)?)
    }

    /// Record a submitted standup.
    pub fn record_standup(&self, standup: &Standup) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO standups (chat_id, user_id, text, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                standup.chat_id,
                standup.user_id,
                standup.text,
                standup.created.timestamp()
            ],
        )?;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|e| StoreError::Lock(e.to_string()))
    }
}

impl StandupStore for SqliteStore {
    fn find_group(&self, chat_id: ChatId) -> Result<Option<Group>, StoreError> {
        let conn = self.lock()?;
        let group = conn
            .query_row(
                "SELECT chat_id, title, tz, language, standup_deadline \
                 FROM chat_groups WHERE chat_id = ?1",
                params![chat_id],
                row_to_group,
            )
            .optional()?;
        Ok(group)
    }

    fn list_groups(&self) -> Result<Vec<Group>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT chat_id, title, tz, language, standup_deadline \
             FROM chat_groups ORDER BY chat_id",
        )?;
        let rows = stmt.query_map([], row_to_group)?;
        let mut groups = Vec::new();
        for r in rows {
            groups.push(r?);
        }
        Ok(groups)
    }

    fn save_group(&self, group: &Group) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO chat_groups (chat_id, title, tz, language, standup_deadline) \
             VALUES (?1, ?2, ?3, ?4, ?5) \
             ON CONFLICT(chat_id) DO UPDATE SET \
             title = excluded.title, tz = excluded.tz, language = excluded.language, \
             standup_deadline = excluded.standup_deadline",
            params![
                group.chat_id,
                group.title,
                group.tz,
                group.language,
                group.standup_deadline
            ],
        )?;
        Ok(())
    }

    fn delete_group(&self, chat_id: ChatId) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM chat_groups WHERE chat_id = ?1", params![chat_id])?;
        Ok(())
    }

    fn create_standuper(&self, standuper: &Standuper) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute(
            &format!("INSERT INTO standupers ({STANDUPER_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"),
            params![
                standuper.chat_id,
                standuper.user_id,
                standuper.username,
                standuper.language_code,
                standuper.tz,
                standuper.warnings,
                standuper.status.as_str(),
                standuper.created.timestamp()
            ],
        )
        .map_err(|e| match e {
            rusqlite::Error::SqliteFailure(err, _)
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                StoreError::Conflict(format!(
                    "standuper {} already exists in chat {}",
                    standuper.user_id, standuper.chat_id
                ))
            }
            other => StoreError::Sqlite(other),
        })?;
        Ok(())
    }

    fn update_standuper(&self, standuper: &Standuper) -> Result<(), StoreError> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE standupers SET username = ?3, language_code = ?4, tz = ?5, \
             warnings = ?6, status = ?7 WHERE chat_id = ?1 AND user_id = ?2",
            params![
                standuper.chat_id,
                standuper.user_id,
                standuper.username,
                standuper.language_code,
                standuper.tz,
                standuper.warnings,
                standuper.status.as_str()
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!(
                "standuper {} in chat {}",
                standuper.user_id, standuper.chat_id
            )));
        }
        Ok(())
    }

    fn find_standuper(
        &self,
        chat_id: ChatId,
        user_id: UserId,
    ) -> Result<Option<Standuper>, StoreError> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                &format!(
                    "SELECT {STANDUPER_COLUMNS} FROM standupers WHERE chat_id = ?1 AND user_id = ?2"
                ),
                params![chat_id, user_id],
                row_to_standuper,
            )
            .optional()?;
        Ok(row)
    }

    fn list_active_standupers(&self, chat_id: ChatId) -> Result<Vec<Standuper>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {STANDUPER_COLUMNS} FROM standupers \
             WHERE chat_id = ?1 AND status = 'active' ORDER BY user_id"
        ))?;
        let rows = stmt.query_map(params![chat_id], row_to_standuper)?;
        let mut standupers = Vec::new();
        for r in rows {
            standupers.push(r?);
        }
        Ok(standupers)
    }

    fn delete_standuper(&self, chat_id: ChatId, user_id: UserId) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "DELETE FROM standupers WHERE chat_id = ?1 AND user_id = ?2",
            params![chat_id, user_id],
        )?;
        Ok(())
    }

    fn delete_group_standupers(&self, chat_id: ChatId) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM standupers WHERE chat_id = ?1", params![chat_id])?;
        Ok(())
    }

    fn upsert_thread(&self, thread: &NotificationThread) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO notification_threads \
             (chat_id, user_id, username, next_reminder_at, reminder_counter) \
             VALUES (?1, ?2, ?3, ?4, ?5) \
             ON CONFLICT(chat_id, user_id) DO UPDATE SET \
             username = excluded.username, \
             next_reminder_at = excluded.next_reminder_at, \
             reminder_counter = excluded.reminder_counter",
            params![
                thread.chat_id,
                thread.user_id,
                thread.username,
                thread.next_reminder_at.timestamp(),
                thread.reminder_counter
            ],
        )?;
        Ok(())
    }

    fn list_threads(&self, chat_id: ChatId) -> Result<Vec<NotificationThread>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT chat_id, user_id, username, next_reminder_at, reminder_counter \
             FROM notification_threads WHERE chat_id = ?1 ORDER BY user_id",
        )?;
        let rows = stmt.query_map(params![chat_id], row_to_thread)?;
        let mut threads = Vec::new();
        for r in rows {
            threads.push(r?);
        }
        Ok(threads)
    }

    fn update_thread(&self, thread: &NotificationThread) -> Result<(), StoreError> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE notification_threads SET next_reminder_at = ?3, reminder_counter = ?4 \
             WHERE chat_id = ?1 AND user_id = ?2",
            params![
                thread.chat_id,
                thread.user_id,
                thread.next_reminder_at.timestamp(),
                thread.reminder_counter
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!(
                "thread for user {} in chat {}",
                thread.user_id, thread.chat_id
            )));
        }
        Ok(())
    }

    fn delete_thread(&self, key: ThreadKey) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "DELETE FROM notification_threads WHERE chat_id = ?1 AND user_id = ?2",
            params![key.chat_id, key.user_id],
        )?;
        Ok(())
    }

    fn delete_chat_threads(&self, chat_id: ChatId) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "DELETE FROM notification_threads WHERE chat_id = ?1",
            params![chat_id],
        )?;
        Ok(())
    }
}

impl SubmissionOracle for SqliteStore {
    fn submitted_today(
        &self,
        chat_id: ChatId,
        user_id: UserId,
        local_now: &DateTime<Tz>,
    ) -> Result<bool, StoreError> {
        let (start, end) = local_day_bounds(local_now);
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM standups \
             WHERE chat_id = ?1 AND user_id = ?2 AND created_at >= ?3 AND created_at < ?4",
            params![chat_id, user_id, start.timestamp(), end.timestamp()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}

// ---------------------------------------------------------------------------
// Row conversion helpers
// ---------------------------------------------------------------------------

fn row_to_group(row: &rusqlite::Row<'_>) -> rusqlite::Result<Group> {
    Ok(Group {
        chat_id: row.get(0)?,
        title: row.get(1)?,
        tz: row.get(2)?,
        language: row.get(3)?,
        standup_deadline: row.get(4)?,
    })
}

fn row_to_standuper(row: &rusqlite::Row<'_>) -> rusqlite::Result<Standuper> {
    let status: String = row.get(6)?;
    Ok(Standuper {
        chat_id: row.get(0)?,
        user_id: row.get(1)?,
        username: row.get(2)?,
        language_code: row.get(3)?,
        tz: row.get(4)?,
        warnings: row.get(5)?,
        status: StanduperStatus::parse(&status),
        created: epoch_column(row, 7)?,
    })
}

fn row_to_thread(row: &rusqlite::Row<'_>) -> rusqlite::Result<NotificationThread> {
    Ok(NotificationThread {
        chat_id: row.get(0)?,
        user_id: row.get(1)?,
        username: row.get(2)?,
        next_reminder_at: epoch_column(row, 3)?,
        reminder_counter: row.get(4)?,
    })
}

/// Read an epoch-seconds column as a UTC instant.
fn epoch_column(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let secs: i64 = row.get(idx)?;
    DateTime::from_timestamp(secs, 0).ok_or(rusqlite::Error::IntegralValueOutOfRange(idx, secs))
}
