//! SQLite DDL for the standup store.
//!
//! All `CREATE TABLE` / `CREATE INDEX` statements live here so they are
//! reviewable and testable in isolation.

use rusqlite::Connection;

/// Current schema version stamped into `schema_meta`.
pub(crate) const CURRENT_SCHEMA_VERSION: u32 = 1;

/// Complete DDL. Uses `IF NOT EXISTS` throughout so `apply_schema` is idempotent.
pub(crate) const SCHEMA_SQL: &str = r#"
-- Enable WAL mode for concurrent reads during writes.
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS schema_meta (
    key   TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS chat_groups (
    chat_id          INTEGER PRIMARY KEY,
    title            TEXT NOT NULL DEFAULT '',
    tz               TEXT NOT NULL DEFAULT 'UTC',
    language         TEXT NOT NULL DEFAULT 'en',
    standup_deadline TEXT NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS standupers (
    chat_id       INTEGER NOT NULL,
    user_id       INTEGER NOT NULL,
    username      TEXT,
    language_code TEXT NOT NULL DEFAULT 'en',
    tz            TEXT NOT NULL DEFAULT 'UTC',
    warnings      INTEGER NOT NULL DEFAULT 0,
    status        TEXT NOT NULL DEFAULT 'active',
    created_at    INTEGER NOT NULL DEFAULT 0,   -- epoch seconds
    PRIMARY KEY (chat_id, user_id)
);

CREATE INDEX IF NOT EXISTS idx_standupers_chat_status ON standupers(chat_id, status);

CREATE TABLE IF NOT EXISTS standups (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    chat_id    INTEGER NOT NULL,
    user_id    INTEGER NOT NULL,
    text       TEXT NOT NULL DEFAULT '',
    created_at INTEGER NOT NULL               -- epoch seconds
);

CREATE INDEX IF NOT EXISTS idx_standups_author_time ON standups(chat_id, user_id, created_at);

-- At most one open escalation per (chat, standuper).
CREATE TABLE IF NOT EXISTS notification_threads (
    chat_id          INTEGER NOT NULL,
    user_id          INTEGER NOT NULL,
    username         TEXT,
    next_reminder_at INTEGER NOT NULL,        -- epoch seconds
    reminder_counter INTEGER NOT NULL DEFAULT 0,
    UNIQUE (chat_id, user_id)
);
"#;

/// Apply the full schema to an open connection and seed the version stamp.
pub(crate) fn apply_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_meta (key, value) VALUES ('schema_version', ?1)",
        rusqlite::params![CURRENT_SCHEMA_VERSION.to_string()],
    )?;
    Ok(())
}

/// Read the schema version, or `None` when it was never stamped.
pub(crate) fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<u32>> {
    let mut stmt = conn.prepare("SELECT value FROM schema_meta WHERE key = 'schema_version'")?;
    let mut rows = stmt.query([])?;
    match rows.next()? {
        Some(row) => {
            let val: String = row.get(0)?;
            Ok(val.parse::<u32>().ok())
        }
        None => Ok(None),
    }
}
