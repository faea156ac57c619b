//! Key namespace for persisted Vigil state.
//!
//! Every persisted collection lives under its own prefix so that
//! rehydration can enumerate with `keys_with_prefix`.

use vigil_types::{ActionId, Fingerprint, MetricKey, RuleId, ScaleDirection};

/// Prefix for statistical model snapshots.
pub const MODEL_PREFIX: &str = "vigil:model:";

/// Prefix for seasonal pattern snapshots.
pub const PATTERN_PREFIX: &str = "vigil:pattern:";

/// Prefix for alert rules.
pub const RULE_PREFIX: &str = "vigil:rule:";

/// Key for the active-alert snapshot.
pub const ACTIVE_ALERTS_KEY: &str = "vigil:alerts:active";

/// Prefix for per-fingerprint flapping history.
pub const FLAP_PREFIX: &str = "vigil:flap:";

/// Prefix for remediation action definitions.
pub const ACTION_PREFIX: &str = "vigil:remediation:action:";

/// Prefix for per-action execution history.
pub const EXECUTION_PREFIX: &str = "vigil:remediation:history:";

/// Prefix for autoscaling configs.
pub const AUTOSCALE_CONFIG_PREFIX: &str = "vigil:autoscale:config:";

/// Prefix for per-(service, direction) autoscale cooldown timestamps.
pub const AUTOSCALE_COOLDOWN_PREFIX: &str = "vigil:autoscale:cooldown:";

pub fn model_key(metric: &MetricKey) -> String {
    format!("{}{}", MODEL_PREFIX, metric.storage_key())
}

pub fn pattern_key(metric: &MetricKey) -> String {
    format!("{}{}", PATTERN_PREFIX, metric.storage_key())
}

pub fn rule_key(id: &RuleId) -> String {
    format!("{}{}", RULE_PREFIX, id.as_str())
}

pub fn flap_key(fingerprint: &Fingerprint) -> String {
    format!("{}{}", FLAP_PREFIX, fingerprint.as_str())
}

pub fn action_key(id: &ActionId) -> String {
    format!("{}{}", ACTION_PREFIX, id.as_str())
}

pub fn execution_key(id: &ActionId) -> String {
    format!("{}{}", EXECUTION_PREFIX, id.as_str())
}

pub fn autoscale_config_key(service: &str) -> String {
    format!("{}{}", AUTOSCALE_CONFIG_PREFIX, service)
}

pub fn autoscale_cooldown_key(service: &str, direction: ScaleDirection) -> String {
    format!("{}{}:{}", AUTOSCALE_COOLDOWN_PREFIX, service, direction)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cooldown_keys_are_direction_scoped() {
        let up = autoscale_cooldown_key("api", ScaleDirection::Up);
        let down = autoscale_cooldown_key("api", ScaleDirection::Down);
        assert_ne!(up, down);
        assert!(up.starts_with(AUTOSCALE_COOLDOWN_PREFIX));
    }
}
