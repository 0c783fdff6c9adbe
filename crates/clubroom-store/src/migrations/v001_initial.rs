//! v001 -- Initial schema creation.
//!
//! Creates the `chat_snapshots` table: one row per chat, holding the full
//! last-known chat record as a JSON blob.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Chat snapshots
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS chat_snapshots (
    chat_id  TEXT PRIMARY KEY NOT NULL,   -- remote chat identifier
    payload  TEXT NOT NULL,               -- JSON-encoded Chat record
    saved_at TEXT NOT NULL                -- ISO-8601 / RFC-3339
);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
