//! Autoscaling configuration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Direction of a replica change. Cooldowns are tracked per
/// (service, direction) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScaleDirection {
    Up,
    Down,
}

impl fmt::Display for ScaleDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScaleDirection::Up => write!(f, "up"),
            ScaleDirection::Down => write!(f, "down"),
        }
    }
}

/// Per-service autoscaling policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoscalingConfig {
    /// Service this policy applies to.
    pub service: String,

    /// Whether autoscaling is active for the service.
    pub enabled: bool,

    /// Target CPU utilization percentage.
    pub cpu_target_percent: Option<f64>,

    /// Target memory utilization percentage.
    pub memory_target_percent: Option<f64>,

    /// Target request rate per replica.
    pub requests_target: Option<f64>,

    /// Lower replica bound.
    pub min_replicas: u32,

    /// Upper replica bound.
    pub max_replicas: u32,

    /// Minimum time between two scale-up operations.
    pub scale_up_cooldown: Duration,

    /// Minimum time between two scale-down operations.
    pub scale_down_cooldown: Duration,
}

impl AutoscalingConfig {
    /// Create an enabled policy with conventional defaults.
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            enabled: true,
            cpu_target_percent: None,
            memory_target_percent: None,
            requests_target: None,
            min_replicas: 1,
            max_replicas: 10,
            scale_up_cooldown: Duration::from_secs(180),
            scale_down_cooldown: Duration::from_secs(300),
        }
    }

    pub fn with_cpu_target(mut self, percent: f64) -> Self {
        self.cpu_target_percent = Some(percent);
        self
    }

    pub fn with_memory_target(mut self, percent: f64) -> Self {
        self.memory_target_percent = Some(percent);
        self
    }

    pub fn with_requests_target(mut self, per_replica: f64) -> Self {
        self.requests_target = Some(per_replica);
        self
    }

    pub fn with_replica_bounds(mut self, min: u32, max: u32) -> Self {
        self.min_replicas = min.max(1);
        self.max_replicas = max.max(self.min_replicas);
        self
    }

    /// Target value for a well-known metric name, if configured.
    pub fn target_for(&self, metric: &str) -> Option<f64> {
        match metric {
            "cpu_usage_percent" => self.cpu_target_percent,
            "memory_usage_percent" => self.memory_target_percent,
            "requests_per_second" => self.requests_target,
            _ => None,
        }
    }

    /// Cooldown for a scaling direction.
    pub fn cooldown_for(&self, direction: ScaleDirection) -> Duration {
        match direction {
            ScaleDirection::Up => self.scale_up_cooldown,
            ScaleDirection::Down => self.scale_down_cooldown,
        }
    }

    /// Clamp a desired replica count to the configured bounds.
    pub fn clamp_replicas(&self, desired: u32) -> u32 {
        desired.clamp(self.min_replicas, self.max_replicas)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_lookup() {
        let config = AutoscalingConfig::new("api").with_cpu_target(80.0);
        assert_eq!(config.target_for("cpu_usage_percent"), Some(80.0));
        assert_eq!(config.target_for("memory_usage_percent"), None);
        assert_eq!(config.target_for("disk_io"), None);
    }

    #[test]
    fn test_replica_clamping() {
        let config = AutoscalingConfig::new("api").with_replica_bounds(2, 10);
        assert_eq!(config.clamp_replicas(1), 2);
        assert_eq!(config.clamp_replicas(5), 5);
        assert_eq!(config.clamp_replicas(11), 10);
    }
}
