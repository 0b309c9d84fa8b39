//! Curve and calibration persistence errors.

use std::path::PathBuf;

use crate::common::ErrorSeverity;

/// Errors raised while reading or writing curve presets and calibration files.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Curve file is unreadable or not valid JSON
    #[error("Corrupt curve file {path:?}: {reason}")]
    CorruptCurveFile {
        /// Offending file
        path: PathBuf,
        /// Parse or read failure
        reason: String,
    },

    /// A debounced save failed; retried on the next trigger
    #[error("Persistence failure: {0}")]
    PersistenceFailure(String),

    /// Curve name cannot be used as a file name
    #[error("Invalid curve name: {0:?}")]
    InvalidName(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StorageError {
    /// Create a corrupt file error.
    pub fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        StorageError::CorruptCurveFile {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a persistence failure.
    pub fn persistence(msg: impl Into<String>) -> Self {
        StorageError::PersistenceFailure(msg.into())
    }

    /// Get the error severity.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            StorageError::CorruptCurveFile { .. } => ErrorSeverity::Warning,
            StorageError::PersistenceFailure(_) => ErrorSeverity::Warning,
            StorageError::InvalidName(_) => ErrorSeverity::Warning,
            StorageError::Io(_) => ErrorSeverity::Error,
            StorageError::Json(_) => ErrorSeverity::Error,
        }
    }
}
