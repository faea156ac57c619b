//! Error types for vigil-control.

use thiserror::Error;

/// Errors from control-plane construction and administration.
#[derive(Debug, Error)]
pub enum ControlError {
    /// A required collaborator was not provided to the builder.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// An administrative alert operation failed.
    #[error(transparent)]
    Alert(#[from] vigil_alerts::AlertError),
}

/// Result type for control-plane operations.
pub type Result<T> = std::result::Result<T, ControlError>;
