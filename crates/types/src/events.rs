//! Typed internal events.
//!
//! The subsystems communicate through a closed set of message types
//! dispatched by explicit calls: the anomaly engine emits
//! [`AnomalyEvent`]s, the alert lifecycle manager emits
//! [`AlertStateChange`]s, and metric threshold crossings reach the
//! remediation orchestrator as [`MetricThresholdExceeded`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::alert::{Alert, AlertSeverity, AlertStatus};
use crate::ids::EventId;
use crate::metric::MetricKey;

/// Severity of a detected anomaly.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum AnomalySeverity {
    /// Minor deviation.
    Low,

    /// Notable deviation.
    Medium,

    /// Severe deviation.
    High,
}

impl AnomalySeverity {
    /// Map onto the alert severity scale.
    pub fn to_alert_severity(self) -> AlertSeverity {
        match self {
            AnomalySeverity::Low => AlertSeverity::Info,
            AnomalySeverity::Medium => AlertSeverity::Warning,
            AnomalySeverity::High => AlertSeverity::Critical,
        }
    }
}

impl fmt::Display for AnomalySeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnomalySeverity::Low => write!(f, "low"),
            AnomalySeverity::Medium => write!(f, "medium"),
            AnomalySeverity::High => write!(f, "high"),
        }
    }
}

/// A detected anomaly. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalyEvent {
    /// Event id.
    pub id: EventId,

    /// Metric stream the anomaly was detected on.
    pub key: MetricKey,

    /// Severity grade.
    pub severity: AnomalySeverity,

    /// Detection confidence (0.0-1.0).
    pub confidence: f64,

    /// Final anomaly score (z-score units).
    pub score: f64,

    /// Value the model expected.
    pub expected_value: f64,

    /// Value actually observed.
    pub actual_value: f64,

    /// Time of the triggering sample.
    pub timestamp: DateTime<Utc>,

    /// Diagnostic context (raw/seasonal scores, triggering rule, ...).
    pub context: BTreeMap<String, String>,
}

/// A transition in an alert's lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertStateChange {
    /// The alert after the transition.
    pub alert: Alert,

    /// State before the transition; `None` for a brand-new alert.
    pub previous: Option<AlertStatus>,

    /// State after the transition.
    pub current: AlertStatus,

    /// Time of the transition.
    pub occurred_at: DateTime<Utc>,
}

impl AlertStateChange {
    /// Whether this is a fresh firing (none -> firing).
    pub fn is_new_firing(&self) -> bool {
        self.previous.is_none() && self.current == AlertStatus::Firing
    }

    /// Whether this is a resolution (firing -> resolved).
    pub fn is_resolution(&self) -> bool {
        self.current == AlertStatus::Resolved
    }
}

/// A metric sample crossed a configured threshold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricThresholdExceeded {
    /// Metric name.
    pub metric: String,

    /// Observed value.
    pub value: f64,

    /// Service the sample belongs to, if known.
    pub service: Option<String>,

    /// Time of the observation.
    pub observed_at: DateTime<Utc>,
}
