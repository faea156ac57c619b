//! Error types for vigil-state.

use thiserror::Error;

/// Errors that can occur while persisting or loading snapshots.
#[derive(Debug, Error)]
pub enum StateError {
    /// Snapshot could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Backend rejected or failed the operation.
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Result type for state operations.
pub type Result<T> = std::result::Result<T, StateError>;
