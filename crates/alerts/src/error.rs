//! Error types for vigil-alerts.

use thiserror::Error;
use vigil_types::AlertId;

/// Errors surfaced by administrative alert operations. Ingestion itself
/// is fire-and-forget and never returns these.
#[derive(Debug, Error)]
pub enum AlertError {
    /// No active alert with the given id.
    #[error("no active alert with id {0}")]
    AlertNotFound(AlertId),

    /// No rule with the given id.
    #[error("no rule with id {0}")]
    RuleNotFound(String),

    /// Snapshot persistence failed.
    #[error("persistence error: {0}")]
    Persistence(#[from] vigil_state::StateError),
}

/// Result type for alert operations.
pub type Result<T> = std::result::Result<T, AlertError>;
