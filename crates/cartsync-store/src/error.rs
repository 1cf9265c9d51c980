//! Store error types.

use thiserror::Error;

/// Errors that can occur when reading or writing the store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Failed to serialize or deserialize a value.
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Failed to read or write the backing file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The backend rejected the operation.
    #[error("Backend error: {0}")]
    Backend(String),

    /// Writing the value would exceed the backend's quota.
    #[error("Quota exceeded writing {key}: {needed} bytes needed, {limit} bytes allowed")]
    QuotaExceeded {
        key: String,
        needed: usize,
        limit: usize,
    },

    /// The stored payload is not a valid entry envelope.
    #[error("Corrupt entry for key {0}")]
    Corrupt(String),
}
