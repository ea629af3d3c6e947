//! Document service
//!
//! The `DocumentService` owns the plaintext/ciphertext boundary. Plaintext
//! goes in through `save_*`, is encrypted, and only the encrypted record
//! reaches the [`LocalStore`]. Reads decrypt before anything is returned.
//!
//! ## Sync status
//!
//! ```text
//!            save                mark_as_synced
//! (new) ──────────▶ pending ─────────────────────▶ synced
//!                   ▲    │ save                      │
//!                   │    └──────┘                    │ save
//!                   └────────────────────────────────┘
//!
//! any ── mark_as_conflict (external decision) ──▶ conflict ── save ──▶ pending
//! ```
//!
//! Every save writes `pending`, including a save of a conflicted document:
//! the local edit is the newest state and has to be pushed.
//!
//! ## Concurrency
//!
//! There is no compare-and-swap on `version`: two overlapping saves of the
//! same id are last-write-wins on both the document and draft tables.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::crypto::CryptoEngine;
use crate::error::Result;
use crate::models::{
    word_count, AiContext, AiContextRecord, Document, DocumentMetadata, DocumentRecord, Draft,
    DraftRecord, SyncStatus,
};
use crate::storage::{timestamp_now, LocalStore};

/// Encrypt-on-write, decrypt-on-read facade over the local store
pub struct DocumentService {
    store: LocalStore,
    crypto: CryptoEngine,
}

impl DocumentService {
    /// Create a service over an opened store
    pub fn new(store: LocalStore) -> Self {
        Self::with_crypto(store, CryptoEngine::new())
    }

    /// Create a service with a specific crypto engine
    pub fn with_crypto(store: LocalStore, crypto: CryptoEngine) -> Self {
        Self { store, crypto }
    }

    /// Get the underlying store
    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    /// Get mutable access to the underlying store
    pub fn store_mut(&mut self) -> &mut LocalStore {
        &mut self.store
    }

    /// Get the crypto engine
    pub fn crypto(&self) -> &CryptoEngine {
        &self.crypto
    }

    /// Close the service and its store
    pub fn close(self) -> Result<()> {
        self.store.close()?;
        Ok(())
    }

    // ==================== Documents ====================

    /// Save a document and its companion draft
    ///
    /// The stored version becomes the prior stored version plus one (first
    /// save yields 1) and the document is marked pending. Both ciphertexts
    /// are produced before anything is written, so an encryption failure
    /// leaves the previous record untouched. Returns the saved document.
    pub fn save_document(&self, doc: &Document, secret: &str) -> Result<Document> {
        let doc_payload = self.crypto.encrypt(&doc.content, secret)?;
        let draft_payload = self.crypto.encrypt(&doc.content, secret)?;

        let prior_version = self
            .store
            .get_document(&doc.id)?
            .map_or(0, |r| r.metadata.version);
        let sync_status = SyncStatus::Pending;
        let now = timestamp_now();

        let metadata = DocumentMetadata {
            word_count: word_count(&doc.content),
            last_modified: now,
            version: prior_version + 1,
            tags: doc.metadata.tags.clone(),
            ai_suggestions: doc.metadata.ai_suggestions.clone(),
        };

        let record = DocumentRecord {
            id: doc.id.clone(),
            user_id: doc.user_id.clone(),
            title: doc.title.clone(),
            content: doc_payload.ciphertext,
            metadata: metadata.clone(),
            sync_status,
            iv: doc_payload.iv,
        };
        self.store.put_document(&record)?;

        self.store.put_draft(&DraftRecord {
            document_id: doc.id.clone(),
            content: draft_payload.ciphertext,
            iv: draft_payload.iv,
            timestamp: now,
        })?;

        debug!(id = %doc.id, version = metadata.version, status = %sync_status, "Saved document");

        Ok(Document {
            id: record.id,
            user_id: record.user_id,
            title: record.title,
            content: doc.content.clone(),
            metadata,
            sync_status,
        })
    }

    /// Load and decrypt a document
    ///
    /// Returns `None` if no document has this id.
    pub fn get_document(&self, id: &str, secret: &str) -> Result<Option<Document>> {
        let Some(record) = self.store.get_document(id)? else {
            debug!(id, "Document not found");
            return Ok(None);
        };

        let content = self.crypto.decrypt(&record.content, &record.iv, secret)?;
        Ok(Some(Document {
            id: record.id,
            user_id: record.user_id,
            title: record.title,
            content,
            metadata: record.metadata,
            sync_status: record.sync_status,
        }))
    }

    /// Delete a document along with its draft and AI context
    ///
    /// Returns whether the document existed.
    pub fn delete_document(&self, id: &str) -> Result<bool> {
        let existed = self.store.delete_document(id)?;
        self.store.delete_draft(id)?;
        self.store.delete_ai_context(id)?;
        debug!(id, existed, "Deleted document");
        Ok(existed)
    }

    // ==================== Drafts ====================

    /// Save a draft snapshot for a document
    pub fn save_draft(&self, document_id: &str, content: &str, secret: &str) -> Result<Draft> {
        let payload = self.crypto.encrypt(content, secret)?;
        let timestamp = timestamp_now();

        self.store.put_draft(&DraftRecord {
            document_id: document_id.to_string(),
            content: payload.ciphertext,
            iv: payload.iv,
            timestamp,
        })?;

        debug!(document_id, "Saved draft");
        Ok(Draft {
            document_id: document_id.to_string(),
            content: content.to_string(),
            timestamp,
        })
    }

    /// Load and decrypt the draft for a document
    pub fn get_draft(&self, document_id: &str, secret: &str) -> Result<Option<Draft>> {
        let Some(record) = self.store.get_draft(document_id)? else {
            return Ok(None);
        };

        let content = self.crypto.decrypt(&record.content, &record.iv, secret)?;
        Ok(Some(Draft {
            document_id: record.document_id,
            content,
            timestamp: record.timestamp,
        }))
    }

    // ==================== AI context ====================

    /// Serialize, encrypt, and store auxiliary state for a document
    pub fn save_ai_context<T: Serialize>(
        &self,
        document_id: &str,
        context: &T,
        secret: &str,
    ) -> Result<()> {
        let bytes = serde_json::to_vec(context)?;
        let payload = self.crypto.encrypt_bytes(&bytes, secret)?;

        self.store.put_ai_context(&AiContextRecord {
            document_id: document_id.to_string(),
            context: payload.ciphertext,
            iv: payload.iv,
            timestamp: timestamp_now(),
        })?;

        debug!(document_id, bytes = bytes.len(), "Saved AI context");
        Ok(())
    }

    /// Load, decrypt, and deserialize auxiliary state for a document
    pub fn get_ai_context<T: DeserializeOwned>(
        &self,
        document_id: &str,
        secret: &str,
    ) -> Result<Option<AiContext<T>>> {
        let Some(record) = self.store.get_ai_context(document_id)? else {
            return Ok(None);
        };

        let bytes = self
            .crypto
            .decrypt_bytes(&record.context, &record.iv, secret)?;
        let context = serde_json::from_slice(&bytes)?;

        Ok(Some(AiContext {
            document_id: record.document_id,
            context,
            timestamp: record.timestamp,
        }))
    }

    // ==================== Sync status ====================

    /// Ids of every document awaiting upload, in no particular order
    pub fn get_pending_sync(&self) -> Result<Vec<String>> {
        Ok(self.store.document_ids_by_status(SyncStatus::Pending)?)
    }

    /// Mark a document as confirmed on the remote store
    ///
    /// Idempotent; a missing id is a no-op.
    pub fn mark_as_synced(&self, id: &str) -> Result<()> {
        let found = self.store.set_sync_status(id, SyncStatus::Synced)?;
        debug!(id, found, "Marked synced");
        Ok(())
    }

    /// Flag a document as conflicted
    ///
    /// Only an external reconciliation decision calls this. A missing id is
    /// a no-op.
    pub fn mark_as_conflict(&self, id: &str) -> Result<()> {
        let found = self.store.set_sync_status(id, SyncStatus::Conflict)?;
        debug!(id, found, "Marked conflict");
        Ok(())
    }

    /// Every document owned by a user, in stored (encrypted) form
    pub fn get_all_documents(&self, user_id: &str) -> Result<Vec<DocumentRecord>> {
        Ok(self.store.documents_by_user(user_id)?)
    }

    /// Every conflicted document, in stored (encrypted) form
    pub fn get_conflicts(&self) -> Result<Vec<DocumentRecord>> {
        Ok(self.store.documents_by_status(SyncStatus::Conflict)?)
    }
}
