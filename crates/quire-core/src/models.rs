//! Data models for Quire
//!
//! Two families of types live here:
//!
//! - Plaintext types (`Document`, `Draft`, `AiContext`) are what callers
//!   read and write through the document service.
//! - Record types (`DocumentRecord`, `DraftRecord`, `AiContextRecord`) are
//!   the stored, encrypted shapes. Only these reach the local store, and
//!   these are what the export snapshot carries.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Per-document sync state
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    /// Confirmed persisted on the remote store
    Synced,
    /// Local edits not yet confirmed remotely
    Pending,
    /// Flagged by an external reconciliation decision
    Conflict,
}

impl SyncStatus {
    /// Stable string form used in the database
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Synced => "synced",
            SyncStatus::Pending => "pending",
            SyncStatus::Conflict => "conflict",
        }
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "synced" => Ok(SyncStatus::Synced),
            "pending" => Ok(SyncStatus::Pending),
            "conflict" => Ok(SyncStatus::Conflict),
            other => Err(format!("unknown sync status '{}'", other)),
        }
    }
}

/// Non-sensitive document metadata, stored unencrypted
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    pub word_count: u64,
    pub last_modified: DateTime<Utc>,
    /// Starts at 0, incremented on every save
    pub version: u64,
    pub tags: BTreeSet<String>,
    /// Opaque AI-suggestion payload, owned by whoever produced it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_suggestions: Option<serde_json::Value>,
}

impl Default for DocumentMetadata {
    fn default() -> Self {
        Self {
            word_count: 0,
            last_modified: Utc::now(),
            version: 0,
            tags: BTreeSet::new(),
            ai_suggestions: None,
        }
    }
}

/// A document with plaintext content
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub content: String,
    pub metadata: DocumentMetadata,
    pub sync_status: SyncStatus,
}

impl Document {
    /// Create a new document with a generated id
    pub fn new(user_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), user_id, title)
    }

    /// Create a document with a caller-assigned id
    pub fn with_id(
        id: impl Into<String>,
        user_id: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            user_id: user_id.into(),
            title: title.into(),
            content: String::new(),
            metadata: DocumentMetadata::default(),
            sync_status: SyncStatus::Pending,
        }
    }

    /// Set the plaintext content
    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = content.into();
    }

    /// Add a tag
    pub fn add_tag(&mut self, tag: impl Into<String>) {
        self.metadata.tags.insert(tag.into());
    }

    /// Remove a tag
    pub fn remove_tag(&mut self, tag: &str) {
        self.metadata.tags.remove(tag);
    }

    /// Current version
    pub fn version(&self) -> u64 {
        self.metadata.version
    }
}

/// Count whitespace-separated words
pub fn word_count(text: &str) -> u64 {
    text.split_whitespace().count() as u64
}

/// A stored document: metadata in the clear, content encrypted
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRecord {
    pub id: String,
    pub user_id: String,
    pub title: String,
    #[serde(with = "base64_bytes")]
    pub content: Vec<u8>,
    pub metadata: DocumentMetadata,
    pub sync_status: SyncStatus,
    /// Combined salt and nonce used to decrypt `content`
    #[serde(with = "base64_bytes")]
    pub iv: Vec<u8>,
}

/// Latest plaintext snapshot of a document
#[derive(Debug, Clone, PartialEq)]
pub struct Draft {
    pub document_id: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// A stored draft
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DraftRecord {
    pub document_id: String,
    #[serde(with = "base64_bytes")]
    pub content: Vec<u8>,
    #[serde(with = "base64_bytes")]
    pub iv: Vec<u8>,
    pub timestamp: DateTime<Utc>,
}

/// Auxiliary state attached to a document, typed by the caller
#[derive(Debug, Clone, PartialEq)]
pub struct AiContext<T> {
    pub document_id: String,
    pub context: T,
    pub timestamp: DateTime<Utc>,
}

/// A stored AI context blob
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AiContextRecord {
    pub document_id: String,
    #[serde(with = "base64_bytes")]
    pub context: Vec<u8>,
    #[serde(with = "base64_bytes")]
    pub iv: Vec<u8>,
    pub timestamp: DateTime<Utc>,
}

/// Serde adapter writing byte fields as standard base64 strings
pub(crate) mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}
