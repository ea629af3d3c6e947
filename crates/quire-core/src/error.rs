//! Error types for the Quire core
//!
//! Every public operation returns [`Result`]. Absent records are reported as
//! `Ok(None)`, never as an error.

use thiserror::Error;

use crate::storage::StorageError;
use crate::sync::RemoteError;

/// Result type for core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the crypto engine, local store, and reconciler
#[derive(Error, Debug)]
pub enum Error {
    /// The host could not provide a required cryptographic primitive
    #[error("Cryptographic environment unavailable: {0}")]
    EnvironmentUnavailable(String),

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    /// Wrong secret, corrupted ciphertext, or tampering
    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    /// Combined salt+nonce field has the wrong length
    #[error("Invalid iv length: expected {expected} bytes, got {actual}")]
    InvalidIv { expected: usize, actual: usize },

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Migration was requested without an authenticated remote identity
    #[error("No authenticated user; migration requires a signed-in remote session")]
    NotAuthenticated,

    #[error(transparent)]
    Remote(#[from] RemoteError),
}

impl Error {
    /// Check if the error means the caller's secret does not open the record
    pub fn is_decryption_failure(&self) -> bool {
        matches!(self, Error::DecryptionFailed(_) | Error::InvalidIv { .. })
    }

    /// Check if retrying the same call could succeed
    ///
    /// The core never retries on its own; this is a hint for calling workflows.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Storage(e) => e.is_recoverable(),
            Error::Remote(_) => true,
            _ => false,
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(e: rusqlite::Error) -> Self {
        Error::Storage(StorageError::Database(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decryption_failure_classification() {
        assert!(Error::DecryptionFailed("tag mismatch".into()).is_decryption_failure());
        assert!(Error::InvalidIv {
            expected: 28,
            actual: 3
        }
        .is_decryption_failure());
        assert!(!Error::EncryptionFailed("x".into()).is_decryption_failure());
    }

    #[test]
    fn test_environment_unavailable_is_not_transient() {
        let err = Error::EnvironmentUnavailable("no os rng".into());
        assert!(!err.is_transient());
        assert!(err.to_string().contains("no os rng"));
    }

    #[test]
    fn test_invalid_iv_display() {
        let err = Error::InvalidIv {
            expected: 28,
            actual: 12,
        };
        let msg = err.to_string();
        assert!(msg.contains("28"));
        assert!(msg.contains("12"));
    }
}
