//! Storage layer
//!
//! Handles the on-disk representation of every record kind.
//!
//! ## Architecture
//!
//! - **SQLite**: one database file, three keyed tables
//! - **Ciphertext only**: content columns hold encrypted bytes; the
//!   document service owns the plaintext boundary

pub mod error;
pub mod local;
pub mod schema;

pub use error::{StorageError, StorageResult};
pub use local::{timestamp_now, LocalStore};
pub use schema::{init_schema, needs_init, SCHEMA_VERSION};
