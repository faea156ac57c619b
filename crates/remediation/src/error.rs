//! Error types for vigil-remediation.

use thiserror::Error;
use vigil_types::StepKind;

/// Errors from remediation execution. These stay inside the
/// orchestrator's failure boundary; callers of the handle methods never
/// see them as panics or propagated errors.
#[derive(Debug, Error)]
pub enum RemediationError {
    /// A step exhausted its attempts.
    #[error("{kind} step failed: {reason}")]
    StepFailed { kind: StepKind, reason: String },

    /// A step was missing a required config key.
    #[error("{kind} step missing config key `{key}`")]
    MissingConfig { kind: StepKind, key: String },

    /// One step attempt exceeded its timeout.
    #[error("step timed out after {0:?}")]
    StepTimeout(std::time::Duration),

    /// Infrastructure call failed.
    #[error("infrastructure error: {0}")]
    Infra(#[from] vigil_infra::InfraError),

    /// Snapshot persistence failed.
    #[error("persistence error: {0}")]
    Persistence(#[from] vigil_state::StateError),
}

/// Result type for remediation operations.
pub type Result<T> = std::result::Result<T, RemediationError>;
