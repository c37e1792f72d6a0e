//! Error types for the JSON collection store

use std::time::Duration;
use thiserror::Error;

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Storage error types
#[derive(Error, Debug)]
pub enum StorageError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Lock acquisition or release failed
    #[error("Lock error: {0}")]
    Lock(String),

    /// Waited too long for the collection lock
    #[error("Timed out waiting for collection lock after {0:?}")]
    Timeout(Duration),
}

impl StorageError {
    /// Create a lock error
    pub fn lock(message: impl Into<String>) -> Self {
        Self::Lock(message.into())
    }

    /// Whether this error is a lock conflict worth retrying
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Lock(_) | Self::Timeout(_))
    }
}
