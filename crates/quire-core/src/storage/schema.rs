//! SQLite schema for the local store
//!
//! Three keyed tables hold ciphertext plus non-sensitive metadata. Documents
//! carry secondary indexes on `user_id` and `sync_status` so the sync queue
//! and per-owner listings never need a full scan.

use rusqlite::{Connection, OptionalExtension, Result};

/// Schema version written by this build
pub const SCHEMA_VERSION: i32 = 1;

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS schema_info (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

-- title and metadata in the clear, content encrypted
CREATE TABLE IF NOT EXISTS documents (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    title TEXT NOT NULL,
    content BLOB NOT NULL,
    iv BLOB NOT NULL,
    word_count INTEGER NOT NULL,
    last_modified INTEGER NOT NULL,
    version INTEGER NOT NULL,
    tags TEXT NOT NULL,
    ai_suggestions TEXT,
    sync_status TEXT NOT NULL
        CHECK (sync_status IN ('synced', 'pending', 'conflict'))
);

-- one draft per document, last write wins
CREATE TABLE IF NOT EXISTS drafts (
    document_id TEXT PRIMARY KEY,
    content BLOB NOT NULL,
    iv BLOB NOT NULL,
    timestamp INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS ai_context (
    document_id TEXT PRIMARY KEY,
    context BLOB NOT NULL,
    iv BLOB NOT NULL,
    timestamp INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_documents_user_id ON documents(user_id);
CREATE INDEX IF NOT EXISTS idx_documents_sync_status ON documents(sync_status);
"#;

/// Create any missing tables and indexes and record [`SCHEMA_VERSION`]
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.execute(
        "INSERT OR REPLACE INTO schema_info (key, value) VALUES ('version', ?1)",
        [SCHEMA_VERSION.to_string()],
    )?;
    Ok(())
}

/// Version recorded in the database, or `None` for a fresh file
pub fn get_schema_version(conn: &Connection) -> Result<Option<i32>> {
    let has_info: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'schema_info')",
        [],
        |row| row.get(0),
    )?;
    if !has_info {
        return Ok(None);
    }

    let value: Option<String> = conn
        .query_row(
            "SELECT value FROM schema_info WHERE key = 'version'",
            [],
            |row| row.get(0),
        )
        .optional()?;
    Ok(value.and_then(|v| v.parse().ok()))
}

/// Whether [`init_schema`] still has to run on this connection
pub fn needs_init(conn: &Connection) -> bool {
    !matches!(get_schema_version(conn), Ok(Some(v)) if v >= SCHEMA_VERSION)
}
