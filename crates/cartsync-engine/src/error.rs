//! Engine error types.

use cartsync_store::StoreError;
use thiserror::Error;

/// Errors surfaced by the engine.
///
/// Runtime cart and checkout paths recover from storage problems locally,
/// so in practice these come from configuration loading and from callers
/// that ask for strict storage access.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Invalid or unreadable configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Storage failure.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for EngineError {
    fn from(e: serde_json::Error) -> Self {
        EngineError::Serialization(e.to_string())
    }
}

impl From<toml::de::Error> for EngineError {
    fn from(e: toml::de::Error) -> Self {
        EngineError::Config(e.to_string())
    }
}
