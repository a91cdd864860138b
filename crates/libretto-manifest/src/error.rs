//! Error types for manifest operations.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Manifest and lock file operation errors.
#[derive(Error, Debug)]
pub enum ManifestError {
    /// IO error with path context.
    #[error("IO error at {path}: {message}")]
    Io {
        /// File path.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// JSON parsing error.
    #[error("invalid JSON in {path}: {message}")]
    InvalidJson {
        /// File path.
        path: PathBuf,
        /// Parser message.
        message: String,
    },

    /// The document parsed but is not a usable manifest.
    #[error("invalid manifest {path}: {message}")]
    InvalidManifest {
        /// File path.
        path: PathBuf,
        /// What is wrong.
        message: String,
    },

    /// Lock acquisition timeout.
    #[error("failed to acquire lock on {path} within {timeout:?}")]
    LockTimeout {
        /// Lock file path.
        path: PathBuf,
        /// Timeout duration.
        timeout: Duration,
    },

    /// Content integrity error.
    #[error("integrity check failed for {path}: expected {expected}, got {actual}")]
    IntegrityError {
        /// File written.
        path: PathBuf,
        /// Expected hash.
        expected: String,
        /// Actual hash.
        actual: String,
    },

    /// Transaction state error.
    #[error("transaction error: {0}")]
    TransactionState(String),
}

impl ManifestError {
    /// Create an IO error with context.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: err.to_string(),
        }
    }

    /// Create a JSON error with context.
    #[must_use]
    pub fn json(path: impl Into<PathBuf>, err: &sonic_rs::Error) -> Self {
        Self::InvalidJson {
            path: path.into(),
            message: err.to_string(),
        }
    }

    /// Create an invalid manifest error.
    #[must_use]
    pub fn invalid(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::InvalidManifest {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl From<ManifestError> for libretto_core::Error {
    fn from(err: ManifestError) -> Self {
        match err {
            ManifestError::Io { path, message } => Self::io(path, std::io::Error::other(message)),
            ManifestError::InvalidJson { path, message }
            | ManifestError::InvalidManifest { path, message } => {
                Self::invalid_manifest(message, Some(path))
            }
            other => Self::io(PathBuf::new(), std::io::Error::other(other.to_string())),
        }
    }
}

/// Result type for manifest operations.
pub type Result<T> = std::result::Result<T, ManifestError>;
