//! Migration and sync reconciler
//!
//! Decides what local state has to travel to the remote store and when
//! local state may be cleared.
//!
//! - `export_local_data` / `clear_local_data` are the primitive hand-off
//!   pair: snapshot everything in encrypted form, then wipe once the caller
//!   has confirmed durable remote persistence.
//! - `push_pending` uploads the sync queue and marks what landed.
//! - `migrate` is the one-way guest to authenticated path built on top of
//!   the two primitives. It only clears when every document is on the
//!   remote, and skips ids the remote already holds so a retry can finish.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::remote::{RemoteDocument, RemoteStore};
use crate::error::{Error, Result};
use crate::models::{AiContextRecord, DocumentRecord, DraftRecord, SyncStatus};
use crate::service::DocumentService;

/// Full copy of the local store in stored (encrypted) form
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LocalSnapshot {
    pub documents: Vec<DocumentRecord>,
    pub drafts: Vec<DraftRecord>,
    #[serde(rename = "aiContext")]
    pub ai_context: Vec<AiContextRecord>,
}

impl LocalSnapshot {
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty() && self.drafts.is_empty() && self.ai_context.is_empty()
    }
}

/// Outcome of pushing the sync queue
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Uploaded and marked synced
    pub synced: Vec<String>,
    /// Uploaded, but changed through another connection meanwhile; left pending
    pub superseded: Vec<String>,
    /// Rejected by the remote, with the reason; left pending
    pub failed: Vec<(String, String)>,
}

impl SyncReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty() && self.superseded.is_empty()
    }
}

/// Outcome of a guest to authenticated migration
#[derive(Debug, Clone, PartialEq)]
pub struct MigrationReport {
    /// The account the documents now belong to
    pub user_id: String,
    /// Ids accepted by the remote
    pub migrated: Vec<String>,
    /// Ids the remote rejected, with the reason
    pub failed: Vec<(String, String)>,
    /// Whether local data was cleared
    pub cleared: bool,
    /// What was exported; drafts and AI context travel here for the caller
    pub snapshot: LocalSnapshot,
}

/// Reconciles the local store against a remote store
pub struct Reconciler<'a> {
    service: &'a mut DocumentService,
}

impl<'a> Reconciler<'a> {
    pub fn new(service: &'a mut DocumentService) -> Self {
        Self { service }
    }

    /// Snapshot all three tables without decrypting anything
    pub fn export_local_data(&self) -> Result<LocalSnapshot> {
        let store = self.service.store();
        let snapshot = LocalSnapshot {
            documents: store.all_documents()?,
            drafts: store.all_drafts()?,
            ai_context: store.all_ai_context()?,
        };
        debug!(
            documents = snapshot.documents.len(),
            drafts = snapshot.drafts.len(),
            ai_context = snapshot.ai_context.len(),
            "Exported local data"
        );
        Ok(snapshot)
    }

    /// Clear every local table unconditionally
    ///
    /// Only call this after the exported snapshot is durably stored
    /// elsewhere; nothing here checks that.
    pub fn clear_local_data(&mut self) -> Result<()> {
        self.service.store_mut().clear_all()?;
        info!("Cleared local data");
        Ok(())
    }

    /// Ids of documents that still need remote attention (pending or conflict)
    pub fn outstanding(&self) -> Result<Vec<String>> {
        let store = self.service.store();
        let mut ids = store.document_ids_by_status(SyncStatus::Pending)?;
        ids.extend(store.document_ids_by_status(SyncStatus::Conflict)?);
        Ok(ids)
    }

    /// Upload every pending document and mark the ones that landed
    ///
    /// Conflicted documents are never pushed. A document saved again while
    /// its upload was in flight (by another handle on the same database
    /// file) stays pending so the newer version is sent next time.
    pub async fn push_pending<R: RemoteStore + ?Sized>(&mut self, remote: &R) -> Result<SyncReport> {
        let pending = self
            .service
            .store()
            .documents_by_status(SyncStatus::Pending)?;
        let mut report = SyncReport::default();

        for record in pending {
            let uploaded_version = record.metadata.version;
            let id = record.id.clone();

            if let Err(e) = remote
                .upsert_document(RemoteDocument::from_record(&record))
                .await
            {
                warn!(id = %id, error = %e, "Upload failed");
                report.failed.push((id, e.message));
                continue;
            }

            let current = self.service.store().get_document(&id)?;
            match current {
                Some(current)
                    if current.metadata.version == uploaded_version
                        && current.sync_status == SyncStatus::Pending =>
                {
                    self.service.mark_as_synced(&id)?;
                    report.synced.push(id);
                }
                _ => {
                    debug!(id = %id, uploaded_version, "Document changed during upload");
                    report.superseded.push(id);
                }
            }
        }

        info!(
            synced = report.synced.len(),
            failed = report.failed.len(),
            superseded = report.superseded.len(),
            "Pushed pending documents"
        );
        Ok(report)
    }

    /// Move every local document to the signed-in account
    ///
    /// Fails with [`Error::NotAuthenticated`] when nobody is signed in.
    /// Ids the account already holds remotely count as migrated without a
    /// second insert. Local data is cleared only if every document is on
    /// the remote; otherwise it is left intact and the failures are reported.
    pub async fn migrate<R: RemoteStore + ?Sized>(&mut self, remote: &R) -> Result<MigrationReport> {
        let user_id = remote
            .current_user()
            .await?
            .filter(|u| !u.is_empty())
            .ok_or(Error::NotAuthenticated)?;

        let snapshot = self.export_local_data()?;
        let existing: HashSet<String> = remote
            .list_documents(&user_id)
            .await?
            .into_iter()
            .map(|row| row.id)
            .collect();
        let mut migrated = Vec::new();
        let mut failed = Vec::new();

        for record in &snapshot.documents {
            if existing.contains(&record.id) {
                debug!(id = %record.id, "Already on remote");
                migrated.push(record.id.clone());
                continue;
            }
            let row = RemoteDocument::from_record(record).with_owner(user_id.as_str());
            match remote.insert_document(row).await {
                Ok(()) => migrated.push(record.id.clone()),
                Err(e) => {
                    warn!(id = %record.id, error = %e, "Migration insert failed");
                    failed.push((record.id.clone(), e.message));
                }
            }
        }

        let cleared = failed.is_empty();
        if cleared {
            self.clear_local_data()?;
        }

        info!(
            user_id = %user_id,
            migrated = migrated.len(),
            failed = failed.len(),
            cleared,
            "Migration finished"
        );

        Ok(MigrationReport {
            user_id,
            migrated,
            failed,
            cleared,
            snapshot,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::CryptoEngine;
    use crate::models::Document;
    use crate::storage::LocalStore;
    use crate::sync::{MemoryRemote, RemoteError};
    use async_trait::async_trait;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn service() -> DocumentService {
        DocumentService::with_crypto(
            LocalStore::open_in_memory().unwrap(),
            CryptoEngine::with_iterations(1_000),
        )
    }

    fn save(service: &DocumentService, id: &str, content: &str) {
        let mut doc = Document::with_id(id, "guest", format!("Doc {}", id));
        doc.set_content(content);
        service.save_document(&doc, "pw").unwrap();
    }

    #[test]
    fn test_export_is_encrypted_snapshot() {
        let mut service = service();
        save(&service, "d1", "alpha");
        save(&service, "d2", "beta");
        service
            .save_ai_context("d1", &serde_json::json!({"turns": 2}), "pw")
            .unwrap();

        let reconciler = Reconciler::new(&mut service);
        let snapshot = reconciler.export_local_data().unwrap();

        assert_eq!(snapshot.documents.len(), 2);
        assert_eq!(snapshot.drafts.len(), 2);
        assert_eq!(snapshot.ai_context.len(), 1);
        assert!(snapshot
            .documents
            .iter()
            .all(|d| d.sync_status == SyncStatus::Pending));
        assert!(snapshot.documents.iter().all(|d| d.content != b"alpha" && d.content != b"beta"));

        let json = serde_json::to_value(&snapshot).unwrap();
        assert!(json.get("aiContext").is_some());
        assert!(json.get("documents").is_some());
        assert!(json.get("drafts").is_some());
    }

    #[test]
    fn test_exported_record_decrypts_with_secret() {
        let mut service = service();
        save(&service, "d1", "Chapter One");

        let snapshot = Reconciler::new(&mut service).export_local_data().unwrap();
        let record = &snapshot.documents[0];
        let plaintext = service
            .crypto()
            .decrypt(&record.content, &record.iv, "pw")
            .unwrap();
        assert_eq!(plaintext, "Chapter One");
    }

    #[test]
    fn test_clear_local_data() {
        let mut service = service();
        save(&service, "d1", "alpha");
        save(&service, "d2", "beta");

        Reconciler::new(&mut service).clear_local_data().unwrap();

        assert!(service.get_all_documents("guest").unwrap().is_empty());
        assert!(service.get_pending_sync().unwrap().is_empty());
        assert!(service.get_draft("d1", "pw").unwrap().is_none());
    }

    #[test]
    fn test_outstanding_includes_conflicts() {
        let mut service = service();
        save(&service, "d1", "alpha");
        save(&service, "d2", "beta");
        save(&service, "d3", "gamma");
        service.mark_as_synced("d2").unwrap();
        service.mark_as_conflict("d3").unwrap();

        let mut ids = Reconciler::new(&mut service).outstanding().unwrap();
        ids.sort();
        assert_eq!(ids, vec!["d1".to_string(), "d3".to_string()]);
    }

    #[tokio::test]
    async fn test_push_pending_marks_synced() {
        let mut service = service();
        save(&service, "d1", "alpha");
        save(&service, "d2", "beta");
        save(&service, "d3", "gamma");
        service.mark_as_conflict("d3").unwrap();
        let remote = MemoryRemote::signed_in("alice");

        let report = Reconciler::new(&mut service)
            .push_pending(&remote)
            .await
            .unwrap();

        let mut synced = report.synced.clone();
        synced.sort();
        assert_eq!(synced, vec!["d1".to_string(), "d2".to_string()]);
        assert!(report.is_complete());
        assert!(service.get_pending_sync().unwrap().is_empty());
        assert_eq!(remote.len().await, 2);
        assert!(remote.get("d3").await.is_none());
    }

    #[tokio::test]
    async fn test_push_pending_failure_leaves_pending() {
        let mut service = service();
        save(&service, "d1", "alpha");
        save(&service, "d2", "beta");
        let remote = MemoryRemote::signed_in("alice");
        remote.reject_inserts_for("d2").await;

        let report = Reconciler::new(&mut service)
            .push_pending(&remote)
            .await
            .unwrap();

        assert_eq!(report.synced, vec!["d1".to_string()]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "d2");
        assert!(!report.is_complete());
        assert_eq!(service.get_pending_sync().unwrap(), vec!["d2".to_string()]);
    }

    #[tokio::test]
    async fn test_migrate_requires_authentication() {
        let mut service = service();
        save(&service, "d1", "alpha");
        let remote = MemoryRemote::new();

        let result = Reconciler::new(&mut service).migrate(&remote).await;

        assert!(matches!(result, Err(Error::NotAuthenticated)));
        assert_eq!(service.store().document_count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_migrate_moves_and_clears() {
        let mut service = service();
        save(&service, "d1", "alpha");
        save(&service, "d2", "beta");
        let remote = MemoryRemote::signed_in("alice");

        let report = Reconciler::new(&mut service).migrate(&remote).await.unwrap();

        assert!(report.cleared);
        assert_eq!(report.user_id, "alice");
        assert_eq!(report.migrated.len(), 2);
        assert_eq!(report.snapshot.drafts.len(), 2);
        assert_eq!(service.store().document_count().unwrap(), 0);

        let rows = remote.list_documents("alice").await.unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.user_id == "alice"));
    }

    #[tokio::test]
    async fn test_migrate_partial_failure_keeps_local_data() {
        let mut service = service();
        save(&service, "d1", "alpha");
        save(&service, "d2", "beta");
        let remote = MemoryRemote::signed_in("alice");
        remote.reject_inserts_for("d1").await;

        let report = Reconciler::new(&mut service).migrate(&remote).await.unwrap();

        assert!(!report.cleared);
        assert_eq!(report.migrated, vec!["d2".to_string()]);
        assert_eq!(report.failed[0].0, "d1");
        assert_eq!(service.store().document_count().unwrap(), 2);
        assert_eq!(
            service.get_document("d1", "pw").unwrap().unwrap().content,
            "alpha"
        );
    }

    #[tokio::test]
    async fn test_migrate_retry_skips_accepted_documents() {
        let mut service = service();
        save(&service, "d1", "alpha");
        save(&service, "d2", "beta");
        let remote = MemoryRemote::signed_in("alice");
        remote.reject_inserts_for("d2").await;

        let first = Reconciler::new(&mut service).migrate(&remote).await.unwrap();
        assert!(!first.cleared);
        assert_eq!(first.migrated, vec!["d1".to_string()]);

        remote.accept_all().await;
        let second = Reconciler::new(&mut service).migrate(&remote).await.unwrap();

        assert!(second.cleared, "retry failed: {:?}", second.failed);
        assert!(second.failed.is_empty());
        let mut migrated = second.migrated.clone();
        migrated.sort();
        assert_eq!(migrated, vec!["d1".to_string(), "d2".to_string()]);
        assert_eq!(remote.len().await, 2);
        assert_eq!(service.store().document_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_push_after_resave_replaces_remote_row() {
        let mut service = service();
        save(&service, "d1", "alpha");
        let remote = MemoryRemote::signed_in("alice");
        Reconciler::new(&mut service)
            .push_pending(&remote)
            .await
            .unwrap();

        save(&service, "d1", "alpha, revised");
        let report = Reconciler::new(&mut service)
            .push_pending(&remote)
            .await
            .unwrap();

        assert_eq!(report.synced, vec!["d1".to_string()]);
        assert_eq!(remote.get("d1").await.unwrap().version, 2);
        assert!(service.get_pending_sync().unwrap().is_empty());
    }

    /// Remote whose upload of one id races a save through a second
    /// connection to the same database file
    struct EditingRemote {
        inner: MemoryRemote,
        path: PathBuf,
        edit_id: String,
    }

    #[async_trait]
    impl RemoteStore for EditingRemote {
        async fn current_user(&self) -> std::result::Result<Option<String>, RemoteError> {
            self.inner.current_user().await
        }

        async fn list_documents(
            &self,
            owner: &str,
        ) -> std::result::Result<Vec<RemoteDocument>, RemoteError> {
            self.inner.list_documents(owner).await
        }

        async fn insert_document(
            &self,
            document: RemoteDocument,
        ) -> std::result::Result<(), RemoteError> {
            self.inner.insert_document(document).await
        }

        async fn upsert_document(
            &self,
            document: RemoteDocument,
        ) -> std::result::Result<(), RemoteError> {
            if document.id == self.edit_id {
                let other = DocumentService::with_crypto(
                    LocalStore::open_path(&self.path).unwrap(),
                    CryptoEngine::with_iterations(1_000),
                );
                save(&other, &self.edit_id, "edited elsewhere");
                other.close().unwrap();
            }
            self.inner.upsert_document(document).await
        }
    }

    #[tokio::test]
    async fn test_push_leaves_concurrently_edited_document_pending() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("quire.db");
        let mut service = DocumentService::with_crypto(
            LocalStore::open_path(&path).unwrap(),
            CryptoEngine::with_iterations(1_000),
        );
        save(&service, "d1", "alpha");
        save(&service, "d2", "beta");
        let remote = EditingRemote {
            inner: MemoryRemote::signed_in("alice"),
            path: path.clone(),
            edit_id: "d1".to_string(),
        };

        let report = Reconciler::new(&mut service)
            .push_pending(&remote)
            .await
            .unwrap();

        assert_eq!(report.superseded, vec!["d1".to_string()]);
        assert_eq!(report.synced, vec!["d2".to_string()]);
        assert!(!report.is_complete());

        let d1 = service.get_document("d1", "pw").unwrap().unwrap();
        assert_eq!(d1.sync_status, SyncStatus::Pending);
        assert_eq!(d1.metadata.version, 2);
        assert_eq!(d1.content, "edited elsewhere");
        assert_eq!(service.get_pending_sync().unwrap(), vec!["d1".to_string()]);
        // The remote holds the version that was uploaded
        assert_eq!(remote.inner.get("d1").await.unwrap().version, 1);
    }
}
