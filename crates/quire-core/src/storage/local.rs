//! SQLite-backed local store
//!
//! Persists the three record kinds (documents, drafts, AI context) in their
//! encrypted form. The store never sees plaintext content.
//!
//! ## Tables
//!
//! - `documents` - Document records, indexed by `user_id` and `sync_status`
//! - `drafts` - Latest draft per document
//! - `ai_context` - Auxiliary state per document
//!
//! Every write is a single statement, so each table write is atomic on its
//! own. Nothing here spans tables except `clear_all`.

use std::collections::BTreeSet;
use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;

use crate::config::Config;
use crate::models::{AiContextRecord, DocumentMetadata, DocumentRecord, DraftRecord, SyncStatus};
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::schema::{get_schema_version, init_schema, needs_init, SCHEMA_VERSION};

const DOCUMENT_COLUMNS: &str = "id, user_id, title, content, iv, word_count, last_modified, version, tags, ai_suggestions, sync_status";

/// Keyed, multi-table local store
pub struct LocalStore {
    conn: Connection,
}

impl LocalStore {
    /// Open or create the store in the configured data directory
    pub fn open(config: &Config) -> StorageResult<Self> {
        Self::open_path(&config.sqlite_path())
    }

    /// Open or create the store at a specific database path
    pub fn open_path(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StorageError::from_io(e, parent.to_path_buf()))?;
        }

        let conn = Connection::open(path)?;
        let _mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;

        if let Some(found) = get_schema_version(&conn)? {
            if found > SCHEMA_VERSION {
                return Err(StorageError::UnsupportedSchema {
                    found,
                    supported: SCHEMA_VERSION,
                });
            }
        }

        if needs_init(&conn) {
            init_schema(&conn)?;
        }

        debug!(path = %path.display(), "Opened local store");
        Ok(Self { conn })
    }

    /// Open an in-memory store (for testing)
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Close the store, surfacing any error from the final flush
    pub fn close(self) -> StorageResult<()> {
        self.conn.close().map_err(|(_, e)| StorageError::Database(e))
    }

    // ==================== Documents ====================

    /// Look up a document by id
    pub fn get_document(&self, id: &str) -> StorageResult<Option<DocumentRecord>> {
        let sql = format!("SELECT {} FROM documents WHERE id = ?", DOCUMENT_COLUMNS);
        let row = self
            .conn
            .query_row(&sql, params![id], DocumentRow::from_row)
            .optional()?;

        row.map(DocumentRow::into_record).transpose()
    }

    /// Insert or replace a document
    ///
    /// `content` and `iv` are written by the same statement.
    pub fn put_document(&self, record: &DocumentRecord) -> StorageResult<()> {
        let tags = serde_json::to_string(&record.metadata.tags)
            .map_err(|e| StorageError::corrupt("documents", &record.id, e.to_string()))?;
        let ai_suggestions = record
            .metadata
            .ai_suggestions
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| StorageError::corrupt("documents", &record.id, e.to_string()))?;

        self.conn.execute(
            r#"
            INSERT INTO documents (id, user_id, title, content, iv, word_count, last_modified, version, tags, ai_suggestions, sync_status)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            ON CONFLICT(id) DO UPDATE SET
                user_id = excluded.user_id,
                title = excluded.title,
                content = excluded.content,
                iv = excluded.iv,
                word_count = excluded.word_count,
                last_modified = excluded.last_modified,
                version = excluded.version,
                tags = excluded.tags,
                ai_suggestions = excluded.ai_suggestions,
                sync_status = excluded.sync_status
            "#,
            params![
                record.id,
                record.user_id,
                record.title,
                record.content,
                record.iv,
                record.metadata.word_count as i64,
                record.metadata.last_modified.timestamp_millis(),
                record.metadata.version as i64,
                tags,
                ai_suggestions,
                record.sync_status.as_str(),
            ],
        )?;
        Ok(())
    }

    /// Set the sync status of a document in place
    ///
    /// Returns `false` if no document has this id.
    pub fn set_sync_status(&self, id: &str, status: SyncStatus) -> StorageResult<bool> {
        let changed = self.conn.execute(
            "UPDATE documents SET sync_status = ? WHERE id = ?",
            params![status.as_str(), id],
        )?;
        Ok(changed > 0)
    }

    /// Delete a document; returns whether it existed
    pub fn delete_document(&self, id: &str) -> StorageResult<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM documents WHERE id = ?", params![id])?;
        Ok(changed > 0)
    }

    /// All documents owned by a user
    pub fn documents_by_user(&self, user_id: &str) -> StorageResult<Vec<DocumentRecord>> {
        let sql = format!(
            "SELECT {} FROM documents WHERE user_id = ? ORDER BY last_modified DESC",
            DOCUMENT_COLUMNS
        );
        self.query_documents(&sql, params![user_id])
    }

    /// All documents with a given sync status
    pub fn documents_by_status(&self, status: SyncStatus) -> StorageResult<Vec<DocumentRecord>> {
        let sql = format!(
            "SELECT {} FROM documents WHERE sync_status = ?",
            DOCUMENT_COLUMNS
        );
        self.query_documents(&sql, params![status.as_str()])
    }

    /// Ids of documents with a given sync status
    pub fn document_ids_by_status(&self, status: SyncStatus) -> StorageResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id FROM documents WHERE sync_status = ?")?;
        let ids = stmt
            .query_map(params![status.as_str()], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(ids)
    }

    /// Every stored document
    pub fn all_documents(&self) -> StorageResult<Vec<DocumentRecord>> {
        let sql = format!("SELECT {} FROM documents ORDER BY id", DOCUMENT_COLUMNS);
        self.query_documents(&sql, params![])
    }

    /// Get document count
    pub fn document_count(&self) -> StorageResult<i64> {
        self.conn
            .query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))
            .map_err(Into::into)
    }

    /// Get document count for a status
    pub fn count_by_status(&self, status: SyncStatus) -> StorageResult<i64> {
        self.conn
            .query_row(
                "SELECT COUNT(*) FROM documents WHERE sync_status = ?",
                params![status.as_str()],
                |row| row.get(0),
            )
            .map_err(Into::into)
    }

    // ==================== Drafts ====================

    /// Look up the draft for a document
    pub fn get_draft(&self, document_id: &str) -> StorageResult<Option<DraftRecord>> {
        let row = self
            .conn
            .query_row(
                "SELECT document_id, content, iv, timestamp FROM drafts WHERE document_id = ?",
                params![document_id],
                BlobRow::from_row,
            )
            .optional()?;

        row.map(|r| r.into_draft()).transpose()
    }

    /// Insert or replace a draft
    pub fn put_draft(&self, record: &DraftRecord) -> StorageResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO drafts (document_id, content, iv, timestamp) VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(document_id) DO UPDATE SET
                content = excluded.content,
                iv = excluded.iv,
                timestamp = excluded.timestamp
            "#,
            params![
                record.document_id,
                record.content,
                record.iv,
                record.timestamp.timestamp_millis()
            ],
        )?;
        Ok(())
    }

    /// Delete a draft; returns whether it existed
    pub fn delete_draft(&self, document_id: &str) -> StorageResult<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM drafts WHERE document_id = ?", params![document_id])?;
        Ok(changed > 0)
    }

    /// Every stored draft
    pub fn all_drafts(&self) -> StorageResult<Vec<DraftRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT document_id, content, iv, timestamp FROM drafts ORDER BY document_id",
        )?;
        let rows = stmt
            .query_map([], BlobRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(BlobRow::into_draft).collect()
    }

    // ==================== AI context ====================

    /// Look up the AI context for a document
    pub fn get_ai_context(&self, document_id: &str) -> StorageResult<Option<AiContextRecord>> {
        let row = self
            .conn
            .query_row(
                "SELECT document_id, context, iv, timestamp FROM ai_context WHERE document_id = ?",
                params![document_id],
                BlobRow::from_row,
            )
            .optional()?;

        row.map(|r| r.into_ai_context()).transpose()
    }

    /// Insert or replace an AI context
    pub fn put_ai_context(&self, record: &AiContextRecord) -> StorageResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO ai_context (document_id, context, iv, timestamp) VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(document_id) DO UPDATE SET
                context = excluded.context,
                iv = excluded.iv,
                timestamp = excluded.timestamp
            "#,
            params![
                record.document_id,
                record.context,
                record.iv,
                record.timestamp.timestamp_millis()
            ],
        )?;
        Ok(())
    }

    /// Delete an AI context; returns whether it existed
    pub fn delete_ai_context(&self, document_id: &str) -> StorageResult<bool> {
        let changed = self.conn.execute(
            "DELETE FROM ai_context WHERE document_id = ?",
            params![document_id],
        )?;
        Ok(changed > 0)
    }

    /// Every stored AI context
    pub fn all_ai_context(&self) -> StorageResult<Vec<AiContextRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT document_id, context, iv, timestamp FROM ai_context ORDER BY document_id",
        )?;
        let rows = stmt
            .query_map([], BlobRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(BlobRow::into_ai_context).collect()
    }

    // ==================== Bulk ====================

    /// Remove every row from all three tables
    pub fn clear_all(&mut self) -> StorageResult<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM documents", [])?;
        tx.execute("DELETE FROM drafts", [])?;
        tx.execute("DELETE FROM ai_context", [])?;
        tx.commit()?;
        Ok(())
    }

    // ==================== Private helpers ====================

    fn query_documents<P: rusqlite::Params>(
        &self,
        sql: &str,
        params: P,
    ) -> StorageResult<Vec<DocumentRecord>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt
            .query_map(params, DocumentRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(DocumentRow::into_record).collect()
    }
}

/// Current time at the precision the store keeps (milliseconds)
pub fn timestamp_now() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now)
}

fn from_millis(table: &'static str, id: &str, millis: i64) -> StorageResult<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| StorageError::corrupt(table, id, format!("timestamp {} out of range", millis)))
}

/// Raw document row, before metadata is parsed
struct DocumentRow {
    id: String,
    user_id: String,
    title: String,
    content: Vec<u8>,
    iv: Vec<u8>,
    word_count: i64,
    last_modified: i64,
    version: i64,
    tags: String,
    ai_suggestions: Option<String>,
    sync_status: String,
}

impl DocumentRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            title: row.get(2)?,
            content: row.get(3)?,
            iv: row.get(4)?,
            word_count: row.get(5)?,
            last_modified: row.get(6)?,
            version: row.get(7)?,
            tags: row.get(8)?,
            ai_suggestions: row.get(9)?,
            sync_status: row.get(10)?,
        })
    }

    fn into_record(self) -> StorageResult<DocumentRecord> {
        const TABLE: &str = "documents";

        let sync_status = self
            .sync_status
            .parse::<SyncStatus>()
            .map_err(|e| StorageError::corrupt(TABLE, &self.id, e))?;
        let tags: BTreeSet<String> = serde_json::from_str(&self.tags)
            .map_err(|e| StorageError::corrupt(TABLE, &self.id, format!("tags: {}", e)))?;
        let ai_suggestions: Option<serde_json::Value> = self
            .ai_suggestions
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
            .map_err(|e| StorageError::corrupt(TABLE, &self.id, format!("ai_suggestions: {}", e)))?;
        let last_modified = from_millis(TABLE, &self.id, self.last_modified)?;

        Ok(DocumentRecord {
            metadata: DocumentMetadata {
                word_count: self.word_count.max(0) as u64,
                last_modified,
                version: self.version.max(0) as u64,
                tags,
                ai_suggestions,
            },
            id: self.id,
            user_id: self.user_id,
            title: self.title,
            content: self.content,
            sync_status,
            iv: self.iv,
        })
    }
}

/// Raw row shared by the drafts and ai_context tables
struct BlobRow {
    document_id: String,
    payload: Vec<u8>,
    iv: Vec<u8>,
    timestamp: i64,
}

impl BlobRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            document_id: row.get(0)?,
            payload: row.get(1)?,
            iv: row.get(2)?,
            timestamp: row.get(3)?,
        })
    }

    fn into_draft(self) -> StorageResult<DraftRecord> {
        let timestamp = from_millis("drafts", &self.document_id, self.timestamp)?;
        Ok(DraftRecord {
            document_id: self.document_id,
            content: self.payload,
            iv: self.iv,
            timestamp,
        })
    }

    fn into_ai_context(self) -> StorageResult<AiContextRecord> {
        let timestamp = from_millis("ai_context", &self.document_id, self.timestamp)?;
        Ok(AiContextRecord {
            document_id: self.document_id,
            context: self.payload,
            iv: self.iv,
            timestamp,
        })
    }
}
