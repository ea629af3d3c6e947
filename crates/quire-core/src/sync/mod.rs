//! Sync reconciliation with a remote store
//!
//! Provides the guest to authenticated migration path and sync-queue
//! upload on top of the local store.
//!
//! ## Flow
//!
//! 1. Saves mark documents `pending`
//! 2. `Reconciler::push_pending` uploads the queue and marks `synced`
//! 3. On first sign-in, `Reconciler::migrate` re-owns every local document
//!    to the account and clears local state once all are accepted
//!
//! ## Usage
//!
//! ```ignore
//! let mut reconciler = Reconciler::new(&mut service);
//! let report = reconciler.migrate(&remote).await?;
//! ```

mod memory;
mod reconciler;
mod remote;

pub use memory::MemoryRemote;
pub use reconciler::{LocalSnapshot, MigrationReport, Reconciler, SyncReport};
pub use remote::{DataSource, RemoteDocument, RemoteError, RemoteStore};
