//! Remote store capability
//!
//! The remote canonical store is an external collaborator. Quire only needs
//! to know who is signed in and which rows an owner already has, and to
//! write rows either create-only or create-or-replace. The row shape is [`RemoteDocument`], a pure
//! field projection of a stored [`DocumentRecord`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::Result;
use crate::models::{base64_bytes, DocumentRecord};
use crate::service::DocumentService;

/// Error reported by a remote store implementation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Remote store error: {message}")]
pub struct RemoteError {
    pub message: String,
}

impl RemoteError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A document row in the shape the remote schema expects
///
/// Content stays encrypted; the projection only renames fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RemoteDocument {
    pub id: String,
    pub user_id: String,
    pub title: String,
    #[serde(with = "base64_bytes")]
    pub content: Vec<u8>,
    #[serde(with = "base64_bytes")]
    pub iv: Vec<u8>,
    pub word_count: u64,
    pub version: u64,
    pub tags: Vec<String>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_suggestions: Option<serde_json::Value>,
}

impl RemoteDocument {
    /// Project a stored record into a remote row
    pub fn from_record(record: &DocumentRecord) -> Self {
        Self {
            id: record.id.clone(),
            user_id: record.user_id.clone(),
            title: record.title.clone(),
            content: record.content.clone(),
            iv: record.iv.clone(),
            word_count: record.metadata.word_count,
            version: record.metadata.version,
            tags: record.metadata.tags.iter().cloned().collect(),
            updated_at: record.metadata.last_modified,
            ai_suggestions: record.metadata.ai_suggestions.clone(),
        }
    }

    /// Re-own the row to another user
    pub fn with_owner(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = user_id.into();
        self
    }
}

/// Remote canonical store
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// The authenticated user's id, or `None` for a guest session
    async fn current_user(&self) -> std::result::Result<Option<String>, RemoteError>;

    /// Every row owned by `owner`
    async fn list_documents(
        &self,
        owner: &str,
    ) -> std::result::Result<Vec<RemoteDocument>, RemoteError>;

    /// Insert a new row; an id that already exists is an error
    async fn insert_document(&self, document: RemoteDocument)
        -> std::result::Result<(), RemoteError>;

    /// Insert a row or replace the one with the same id
    async fn upsert_document(&self, document: RemoteDocument)
        -> std::result::Result<(), RemoteError>;
}

/// Where document listings come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    /// No authenticated identity; read the local store
    Guest,
    /// Signed in; read the remote store
    Authenticated { user_id: String },
}

impl DataSource {
    /// Choose a source from the authentication signal
    pub fn select(authenticated_user: Option<&str>) -> Self {
        match authenticated_user {
            Some(user_id) if !user_id.is_empty() => DataSource::Authenticated {
                user_id: user_id.to_string(),
            },
            _ => DataSource::Guest,
        }
    }

    /// Choose a source by asking the remote who is signed in
    pub async fn detect<R: RemoteStore + ?Sized>(remote: &R) -> Result<Self> {
        let user = remote.current_user().await?;
        Ok(Self::select(user.as_deref()))
    }

    pub fn is_guest(&self) -> bool {
        matches!(self, DataSource::Guest)
    }

    /// Load documents in remote row shape from the selected source
    pub async fn load_documents<R: RemoteStore + ?Sized>(
        &self,
        service: &DocumentService,
        remote: &R,
    ) -> Result<Vec<RemoteDocument>> {
        match self {
            DataSource::Guest => {
                let records = service.store().all_documents()?;
                Ok(records.iter().map(RemoteDocument::from_record).collect())
            }
            DataSource::Authenticated { user_id } => Ok(remote.list_documents(user_id).await?),
        }
    }
}
