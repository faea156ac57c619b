//! Error types for vigil-infra.

use thiserror::Error;

/// Errors from infrastructure-control operations.
#[derive(Debug, Error)]
pub enum InfraError {
    /// HTTP transport failure.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Cluster API returned a failing status.
    #[error("cluster api returned {status} for {operation}")]
    ApiStatus { operation: String, status: u16 },

    /// Process could not be spawned or waited on.
    #[error("process error: {0}")]
    Process(#[from] std::io::Error),

    /// Operation exceeded its deadline.
    #[error("operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Deployment unknown to the platform.
    #[error("unknown deployment: {0}")]
    UnknownDeployment(String),
}

/// Result type for infra operations.
pub type Result<T> = std::result::Result<T, InfraError>;
