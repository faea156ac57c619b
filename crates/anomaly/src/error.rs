//! Error types for vigil-anomaly.

use thiserror::Error;
use vigil_types::MetricKey;

/// Errors from the anomaly engine.
#[derive(Debug, Error)]
pub enum AnomalyError {
    /// Sample value was NaN or infinite.
    #[error("non-finite sample for {key}: {value}")]
    NonFiniteSample { key: MetricKey, value: f64 },

    /// Snapshot persistence failed.
    #[error("persistence error: {0}")]
    Persistence(#[from] vigil_state::StateError),
}

/// Result type for anomaly operations.
pub type Result<T> = std::result::Result<T, AnomalyError>;
