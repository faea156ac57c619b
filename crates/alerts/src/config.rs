//! Alert manager configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use vigil_types::ChannelKind;

/// Configuration for the alert lifecycle manager.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagerConfig {
    /// Rolling window for per-fingerprint rate limiting.
    pub rate_limit_window: Duration,

    /// Alert events allowed per fingerprint inside the window.
    pub rate_limit_max: usize,

    /// Window inspected for flap damping.
    pub flap_window: Duration,

    /// A firing that would be the Nth-or-later transition inside the
    /// flap window is suppressed.
    pub flap_max_transitions: usize,

    /// Transitions retained per fingerprint.
    pub flap_history_capacity: usize,

    /// Transitions older than this are pruned.
    pub flap_history_retention: Duration,

    /// Resolved alerts retained in history.
    pub history_capacity: usize,

    /// Channels used for immediate critical notifications and other
    /// default-channel sends.
    pub default_channels: Vec<ChannelKind>,

    /// Cadence of active-set snapshots (used by the housekeeping loop).
    pub snapshot_interval: Duration,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            rate_limit_window: Duration::from_secs(300),
            rate_limit_max: 10,
            flap_window: Duration::from_secs(600),
            flap_max_transitions: 5,
            flap_history_capacity: 20,
            flap_history_retention: Duration::from_secs(3600),
            history_capacity: 1000,
            default_channels: vec![ChannelKind::Slack, ChannelKind::Email],
            snapshot_interval: Duration::from_secs(60),
        }
    }
}
