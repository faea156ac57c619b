//! Metric keys and samples.
//!
//! A [`MetricKey`] uniquely identifies one statistical model, one seasonal
//! pattern, and one learning buffer in the anomaly engine. Labels are kept
//! in a `BTreeMap` so that the derived hash and the storage key are stable
//! regardless of insertion order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Composite identity of a tracked metric stream.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MetricKey {
    /// Metric name, e.g. `cpu_usage_percent`.
    pub name: String,

    /// Service the metric belongs to, if any.
    pub service: Option<String>,

    /// Additional label set, sorted by key.
    pub labels: BTreeMap<String, String>,
}

impl MetricKey {
    /// Create a key for a bare metric name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            service: None,
            labels: BTreeMap::new(),
        }
    }

    /// Attach a service to the key.
    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }

    /// Attach a label to the key.
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Stable string form used as a persistence key.
    pub fn storage_key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for MetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(service) = &self.service {
            write!(f, "@{}", service)?;
        }
        if !self.labels.is_empty() {
            let labels: Vec<String> = self
                .labels
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            write!(f, "{{{}}}", labels.join(","))?;
        }
        Ok(())
    }
}

/// A single observed metric value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricSample {
    /// Key the sample belongs to.
    pub key: MetricKey,

    /// Observed value.
    pub value: f64,

    /// Time the sample was taken.
    pub timestamp: DateTime<Utc>,
}

impl MetricSample {
    pub fn new(key: MetricKey, value: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            key,
            value,
            timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_key_is_label_order_independent() {
        let a = MetricKey::new("latency_ms")
            .with_service("api")
            .with_label("zone", "us-east")
            .with_label("instance", "i-1");
        let b = MetricKey::new("latency_ms")
            .with_service("api")
            .with_label("instance", "i-1")
            .with_label("zone", "us-east");
        assert_eq!(a.storage_key(), b.storage_key());
        assert_eq!(a, b);
    }

    #[test]
    fn test_display_format() {
        let key = MetricKey::new("error_rate").with_service("checkout");
        assert_eq!(key.to_string(), "error_rate@checkout");
    }
}
