//! Detector configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the statistical anomaly engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Samples required before detection starts.
    pub min_samples: u64,

    /// Z-score at which an anomaly is graded medium.
    pub medium_z_threshold: f64,

    /// Z-score at which an anomaly is graded high.
    pub high_z_threshold: f64,

    /// Learning buffer capacity per key.
    pub buffer_capacity: usize,

    /// Samples older than this are pruned from the buffer.
    pub buffer_retention: Duration,

    /// Buffer size required before seasonal patterns are computed.
    pub seasonal_min_samples: usize,

    /// Seasonal pattern recompute cadence, in new samples.
    pub seasonal_refresh_interval: u64,

    /// Anomaly events retained per key.
    pub history_capacity: usize,

    /// Anomaly events older than this are pruned from history.
    pub history_retention: Duration,

    /// Whether fixed business-rule overrides are evaluated.
    pub business_rules_enabled: bool,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            min_samples: 100,
            medium_z_threshold: 2.0,
            high_z_threshold: 3.0,
            buffer_capacity: 10_080,
            buffer_retention: Duration::from_secs(7 * 24 * 3600),
            seasonal_min_samples: 168,
            seasonal_refresh_interval: 100,
            history_capacity: 1000,
            history_retention: Duration::from_secs(7 * 24 * 3600),
            business_rules_enabled: true,
        }
    }
}
