//! In-memory remote store
//!
//! A [`RemoteStore`] backed by a map, for tests and offline demos. Inserts
//! are create-only like a primary key, and writes for specific ids can be
//! made to fail to exercise partial failures.

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::remote::{RemoteDocument, RemoteError, RemoteStore};

#[derive(Debug, Default)]
struct Inner {
    user: Option<String>,
    rows: BTreeMap<String, RemoteDocument>,
    reject: HashSet<String>,
}

/// Remote store held entirely in memory
#[derive(Debug, Default)]
pub struct MemoryRemote {
    inner: Mutex<Inner>,
}

impl MemoryRemote {
    /// A remote with no signed-in user
    pub fn new() -> Self {
        Self::default()
    }

    /// A remote with a signed-in user
    pub fn signed_in(user_id: impl Into<String>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                user: Some(user_id.into()),
                ..Inner::default()
            }),
        }
    }

    /// Sign in or out
    pub async fn set_user(&self, user_id: Option<String>) {
        self.inner.lock().await.user = user_id;
    }

    /// Make inserts and upserts of this id fail
    pub async fn reject_inserts_for(&self, id: impl Into<String>) {
        self.inner.lock().await.reject.insert(id.into());
    }

    /// Stop rejecting inserts
    pub async fn accept_all(&self) {
        self.inner.lock().await.reject.clear();
    }

    /// Look up a row by id
    pub async fn get(&self, id: &str) -> Option<RemoteDocument> {
        self.inner.lock().await.rows.get(id).cloned()
    }

    /// Number of stored rows
    pub async fn len(&self) -> usize {
        self.inner.lock().await.rows.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl RemoteStore for MemoryRemote {
    async fn current_user(&self) -> Result<Option<String>, RemoteError> {
        Ok(self.inner.lock().await.user.clone())
    }

    async fn list_documents(&self, owner: &str) -> Result<Vec<RemoteDocument>, RemoteError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .rows
            .values()
            .filter(|row| row.user_id == owner)
            .cloned()
            .collect())
    }

    async fn insert_document(&self, document: RemoteDocument) -> Result<(), RemoteError> {
        let mut inner = self.inner.lock().await;
        inner.check_accepted(&document.id)?;
        if inner.rows.contains_key(&document.id) {
            return Err(RemoteError::new(format!("duplicate id '{}'", document.id)));
        }
        inner.rows.insert(document.id.clone(), document);
        Ok(())
    }

    async fn upsert_document(&self, document: RemoteDocument) -> Result<(), RemoteError> {
        let mut inner = self.inner.lock().await;
        inner.check_accepted(&document.id)?;
        inner.rows.insert(document.id.clone(), document);
        Ok(())
    }
}

impl Inner {
    fn check_accepted(&self, id: &str) -> Result<(), RemoteError> {
        if self.reject.contains(id) {
            return Err(RemoteError::new(format!("write rejected for '{}'", id)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn row(id: &str, owner: &str, version: u64) -> RemoteDocument {
        RemoteDocument {
            id: id.to_string(),
            user_id: owner.to_string(),
            title: format!("Doc {}", id),
            content: vec![1, 2, 3],
            iv: vec![0; 28],
            word_count: 1,
            version,
            tags: Vec::new(),
            updated_at: Utc::now(),
            ai_suggestions: None,
        }
    }

    #[tokio::test]
    async fn test_insert_rejects_existing_id() {
        let remote = MemoryRemote::signed_in("alice");
        remote.insert_document(row("d1", "alice", 1)).await.unwrap();

        let err = remote
            .insert_document(row("d1", "alice", 2))
            .await
            .unwrap_err();

        assert!(err.message.contains("duplicate"));
        assert_eq!(remote.get("d1").await.unwrap().version, 1);
        assert_eq!(remote.len().await, 1);
    }

    #[tokio::test]
    async fn test_upsert_replaces_row() {
        let remote = MemoryRemote::new();
        remote.upsert_document(row("d1", "alice", 1)).await.unwrap();
        remote.upsert_document(row("d1", "alice", 2)).await.unwrap();

        assert_eq!(remote.len().await, 1);
        assert_eq!(remote.get("d1").await.unwrap().version, 2);
    }

    #[tokio::test]
    async fn test_rejected_ids_and_owner_filter() {
        let remote = MemoryRemote::signed_in("alice");
        remote.reject_inserts_for("d2").await;

        remote.insert_document(row("d1", "alice", 1)).await.unwrap();
        assert!(remote.insert_document(row("d2", "alice", 1)).await.is_err());
        assert!(remote.upsert_document(row("d2", "alice", 1)).await.is_err());

        remote.accept_all().await;
        remote.upsert_document(row("d2", "alice", 1)).await.unwrap();
        remote.upsert_document(row("d3", "bob", 1)).await.unwrap();

        let alice = remote.list_documents("alice").await.unwrap();
        assert_eq!(alice.len(), 2);
        assert_eq!(remote.current_user().await.unwrap().as_deref(), Some("alice"));
    }
}
