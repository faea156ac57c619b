//! Remediation orchestration.
//!
//! Selects remediation actions for alert state changes and metric
//! threshold crossings, gates execution behind cooldowns, a zero-success
//! circuit ceiling, and a rolling failure window, runs steps strictly in
//! sequence with per-step timeouts and retries, and drives the narrower
//! autoscaling policy with per-(service, direction) cooldowns.

pub mod autoscaler;
pub mod config;
pub mod error;
pub mod ledger;
pub mod orchestrator;
pub mod sanitize;
pub mod template;

pub use autoscaler::{Autoscaler, ScaleDecision};
pub use config::OrchestratorConfig;
pub use error::{RemediationError, Result};
pub use ledger::ExecutionLedger;
pub use orchestrator::{ActionOutcome, RemediationOrchestrator, SkipReason};
