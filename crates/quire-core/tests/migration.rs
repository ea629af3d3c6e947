//! Guest session to signed-in account, against an on-disk store

use quire_core::{
    Config, CryptoEngine, DataSource, Document, DocumentService, LocalStore, MemoryRemote,
    Reconciler, RemoteStore, SyncStatus,
};
use tempfile::TempDir;

fn test_config(temp_dir: &TempDir) -> Config {
    Config {
        data_dir: temp_dir.path().to_path_buf(),
        ..Config::default()
    }
}

fn open(config: &Config) -> DocumentService {
    DocumentService::with_crypto(
        LocalStore::open(config).unwrap(),
        CryptoEngine::with_iterations(1_000),
    )
}

fn doc(id: &str, content: &str) -> Document {
    let mut doc = Document::with_id(id, "guest", format!("Doc {}", id));
    doc.set_content(content);
    doc
}

#[test]
fn test_store_survives_restart() {
    let temp_dir = TempDir::new().unwrap();
    let config = test_config(&temp_dir);

    {
        let service = open(&config);
        service.save_document(&doc("d1", "Chapter One"), "pw").unwrap();
        service.mark_as_synced("d1").unwrap();
        service.close().unwrap();
    }

    let service = open(&config);
    let loaded = service.get_document("d1", "pw").unwrap().unwrap();
    assert_eq!(loaded.content, "Chapter One");
    assert_eq!(loaded.sync_status, SyncStatus::Synced);
    assert!(config.sqlite_path().exists());
}

#[test]
fn test_export_then_clear() {
    let temp_dir = TempDir::new().unwrap();
    let mut service = open(&test_config(&temp_dir));
    service.save_document(&doc("d1", "one"), "pw").unwrap();
    service.save_document(&doc("d2", "two"), "pw").unwrap();
    assert_eq!(service.get_pending_sync().unwrap().len(), 2);

    let mut reconciler = Reconciler::new(&mut service);
    let snapshot = reconciler.export_local_data().unwrap();
    let mut ids: Vec<_> = snapshot.documents.iter().map(|d| d.id.clone()).collect();
    ids.sort();
    assert_eq!(ids, vec!["d1".to_string(), "d2".to_string()]);

    // Snapshot survives a JSON round trip intact
    let json = serde_json::to_string(&snapshot).unwrap();
    let parsed: quire_core::LocalSnapshot = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, snapshot);

    reconciler.clear_local_data().unwrap();

    assert!(service.get_all_documents("guest").unwrap().is_empty());
    assert!(service.get_pending_sync().unwrap().is_empty());
}

#[tokio::test]
async fn test_guest_to_account_migration() {
    let temp_dir = TempDir::new().unwrap();
    let mut service = open(&test_config(&temp_dir));
    let remote = MemoryRemote::new();

    service.save_document(&doc("d1", "Chapter One"), "pw").unwrap();
    service.save_document(&doc("d2", "Chapter Two"), "pw").unwrap();

    // Guest mode lists local documents in remote row shape
    let source = DataSource::detect(&remote).await.unwrap();
    assert!(source.is_guest());
    let rows = source.load_documents(&service, &remote).await.unwrap();
    assert_eq!(rows.len(), 2);

    // Sign in and migrate
    remote.set_user(Some("alice".to_string())).await;
    let report = Reconciler::new(&mut service).migrate(&remote).await.unwrap();
    assert!(report.cleared);
    assert_eq!(report.migrated.len(), 2);

    // Authenticated mode now reads from the remote
    let source = DataSource::detect(&remote).await.unwrap();
    assert_eq!(
        source,
        DataSource::Authenticated {
            user_id: "alice".to_string()
        }
    );
    let rows = source.load_documents(&service, &remote).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert!(service.store().all_documents().unwrap().is_empty());

    // Migrated content is still the caller's ciphertext
    let row = remote.get("d1").await.unwrap();
    let plaintext = service.crypto().decrypt(&row.content, &row.iv, "pw").unwrap();
    assert_eq!(plaintext, "Chapter One");
}

#[tokio::test]
async fn test_failed_migration_can_be_retried() {
    let temp_dir = TempDir::new().unwrap();
    let mut service = open(&test_config(&temp_dir));
    let remote = MemoryRemote::signed_in("alice");
    remote.reject_inserts_for("d2").await;

    service.save_document(&doc("d1", "one"), "pw").unwrap();
    service.save_document(&doc("d2", "two"), "pw").unwrap();

    let first = Reconciler::new(&mut service).migrate(&remote).await.unwrap();
    assert!(!first.cleared);
    assert_eq!(service.store().document_count().unwrap(), 2);

    remote.accept_all().await;
    let second = Reconciler::new(&mut service).migrate(&remote).await.unwrap();
    assert!(second.cleared);
    assert_eq!(remote.list_documents("alice").await.unwrap().len(), 2);
    assert_eq!(service.store().document_count().unwrap(), 0);
}
