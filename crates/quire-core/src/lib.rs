//! Quire Core Library
//!
//! This crate provides the core functionality for Quire, a local-first,
//! encrypted document store that works offline as a guest and later
//! migrates to an authenticated, server-backed account.
//!
//! # Architecture
//!
//! - **Crypto**: PBKDF2-derived keys, AES-256-GCM per record
//! - **Storage**: SQLite tables holding ciphertext plus indexable metadata
//! - **Service**: encrypt-on-write, decrypt-on-read, sync status, versions
//! - **Sync**: export/clear, queue upload, and guest-to-account migration
//!
//! # Quick Start
//!
//! ```text
//! let config = Config::load()?;
//! let service = DocumentService::new(LocalStore::open(&config)?);
//!
//! let mut doc = Document::with_id("d1", "guest", "Chapter One");
//! doc.set_content("It was a dark and stormy night.");
//! service.save_document(&doc, "passphrase")?;
//!
//! let loaded = service.get_document("d1", "passphrase")?;
//! ```
//!
//! # Modules
//!
//! - `crypto`: Key derivation and authenticated encryption
//! - `storage`: Local SQLite store
//! - `service`: Document service (main entry point)
//! - `models`: Plaintext and stored record types
//! - `sync`: Reconciler and remote store capability
//! - `config`: Application configuration

pub mod config;
pub mod crypto;
pub mod error;
pub mod models;
pub mod service;
pub mod storage;
pub mod sync;

pub use config::Config;
pub use crypto::{CryptoEngine, EncryptedPayload};
pub use error::{Error, Result};
pub use models::{
    AiContext, AiContextRecord, Document, DocumentMetadata, DocumentRecord, Draft, DraftRecord,
    SyncStatus,
};
pub use service::DocumentService;
pub use storage::{LocalStore, StorageError};
pub use sync::{
    DataSource, LocalSnapshot, MemoryRemote, MigrationReport, Reconciler, RemoteDocument,
    RemoteError, RemoteStore, SyncReport,
};
