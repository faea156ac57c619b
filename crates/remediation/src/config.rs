//! Orchestrator configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use vigil_types::ChannelKind;

/// Configuration for the remediation orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Base of the linear retry backoff (`base * attempt`).
    pub backoff_base: Duration,

    /// Consecutive failures with zero lifetime successes after which an
    /// action is considered permanently broken and skipped.
    pub circuit_failure_ceiling: u32,

    /// Rolling window inspected for the failure ceiling below.
    pub rolling_failure_window: Duration,

    /// Failures inside the rolling window at which execution is skipped.
    pub rolling_failure_max: usize,

    /// Channels used for remediation failure notifications.
    pub failure_channels: Vec<ChannelKind>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            backoff_base: Duration::from_secs(1),
            circuit_failure_ceiling: 5,
            rolling_failure_window: Duration::from_secs(3600),
            rolling_failure_max: 10,
            failure_channels: vec![ChannelKind::Slack],
        }
    }
}
