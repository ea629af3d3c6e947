//! Local store errors
//!
//! Filesystem failures are classified by path so the CLI can say what to do
//! about them; SQLite errors pass through unchanged.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by [`LocalStore`](super::LocalStore)
#[derive(Error, Debug)]
pub enum StorageError {
    /// The data directory could not be created
    #[error("Cannot create data directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Permission denied for '{path}'")]
    PermissionDenied {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// No space or quota left on the device holding `path`
    #[error("No space left for '{path}'")]
    DiskFull {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Path not found: '{path}'")]
    NotFound { path: PathBuf },

    /// A stored row could not be mapped back into a record
    #[error("Corrupt row in '{table}' for id '{id}': {details}")]
    CorruptRecord {
        table: &'static str,
        id: String,
        details: String,
    },

    /// The database was written by a newer build
    #[error("Database schema version {found} is newer than supported version {supported}")]
    UnsupportedSchema { found: i32, supported: i32 },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl StorageError {
    /// Classify an I/O failure on `path`
    ///
    /// Anything that is not a permission, space or missing-path problem is
    /// reported as a directory creation failure.
    pub fn from_io(error: io::Error, path: PathBuf) -> Self {
        if error.kind() == io::ErrorKind::NotFound {
            return StorageError::NotFound { path };
        }
        if error.kind() == io::ErrorKind::PermissionDenied {
            return StorageError::PermissionDenied {
                path,
                source: error,
            };
        }
        if out_of_space(&error) {
            return StorageError::DiskFull {
                path,
                source: error,
            };
        }
        StorageError::CreateDirectory {
            path,
            source: error,
        }
    }

    pub(crate) fn corrupt(table: &'static str, id: &str, details: impl Into<String>) -> Self {
        StorageError::CorruptRecord {
            table,
            id: id.to_string(),
            details: details.into(),
        }
    }

    /// Whether the user can fix this without a code change
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            StorageError::DiskFull { .. }
                | StorageError::PermissionDenied { .. }
                | StorageError::UnsupportedSchema { .. }
        )
    }

    /// A one-line hint for the user, if there is one
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        let hint = match self {
            StorageError::DiskFull { .. } => "Free up disk space and try again.",
            StorageError::PermissionDenied { .. } => {
                "Check ownership and permissions of the data directory, or set QUIRE_DATA_DIR."
            }
            StorageError::CreateDirectory { .. } => {
                "Make sure the parent of the data directory exists and is writable."
            }
            StorageError::UnsupportedSchema { .. } => {
                "Upgrade quire, or point QUIRE_DATA_DIR at a different directory."
            }
            StorageError::CorruptRecord { .. } => {
                "Export what still reads with `quire export`, then clear and re-import."
            }
            _ => return None,
        };
        Some(hint)
    }
}

// ENOSPC and EDQUOT on Linux and macOS; the message check covers Windows
fn out_of_space(error: &io::Error) -> bool {
    if matches!(error.raw_os_error(), Some(28) | Some(69) | Some(122)) {
        return true;
    }
    let msg = error.to_string().to_lowercase();
    ["no space left", "disk full", "quota exceeded", "not enough space"]
        .iter()
        .any(|needle| msg.contains(needle))
}

/// Result type for local store operations
pub type StorageResult<T> = Result<T, StorageError>;
