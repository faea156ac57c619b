//! Alerts and their lifecycle states.
//!
//! An alert's canonical identity is its [`Fingerprint`], a stable hash of
//! the alert name and sorted label set. Repeated firings of the same
//! logical condition dedup onto one active alert via the fingerprint; the
//! caller-supplied [`AlertId`] is retained only for display and for
//! addressing silence/acknowledge operations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

use crate::ids::{AlertId, SilenceId};

/// Annotation key set by an acknowledgement.
pub const ACK_ANNOTATION: &str = "acknowledged_by";

/// Severity of an alert.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    /// Informational only.
    Info,

    /// Needs attention but not immediately.
    Warning,

    /// Needs immediate attention.
    Critical,
}

impl fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertSeverity::Info => write!(f, "info"),
            AlertSeverity::Warning => write!(f, "warning"),
            AlertSeverity::Critical => write!(f, "critical"),
        }
    }
}

/// Lifecycle state of an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    /// Condition observed but duration not yet satisfied.
    Pending,

    /// Condition is active.
    Firing,

    /// Condition has cleared. Terminal, retained in history.
    Resolved,
}

impl fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertStatus::Pending => write!(f, "pending"),
            AlertStatus::Firing => write!(f, "firing"),
            AlertStatus::Resolved => write!(f, "resolved"),
        }
    }
}

/// Stable hash of alert name + sorted labels.
///
/// Truncated SHA-256, hex-encoded. Stable across processes and restarts,
/// which makes it safe to persist and to use as the dedup key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Compute the fingerprint for a name and label set.
    pub fn compute(name: &str, labels: &BTreeMap<String, String>) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(name.as_bytes());
        for (key, value) in labels {
            hasher.update([0u8]);
            hasher.update(key.as_bytes());
            hasher.update([0u8]);
            hasher.update(value.as_bytes());
        }
        let digest = hasher.finalize();
        Self(hex::encode(&digest[..8]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single alert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    /// Caller-supplied or generated id. Display/addressing only; dedup
    /// uses the fingerprint.
    pub id: AlertId,

    /// Alert name, e.g. `HighErrorRate`.
    pub name: String,

    /// Severity.
    pub severity: AlertSeverity,

    /// Lifecycle state.
    pub status: AlertStatus,

    /// Human-readable description.
    pub description: String,

    /// Label set, part of the identity.
    pub labels: BTreeMap<String, String>,

    /// Annotations, mutable across repeated firings.
    pub annotations: BTreeMap<String, String>,

    /// Time the alert started firing.
    pub starts_at: DateTime<Utc>,

    /// Time the alert resolved, if it has.
    pub ends_at: Option<DateTime<Utc>>,

    /// Canonical dedup identity.
    pub fingerprint: Fingerprint,

    /// Silence covering this alert, if any.
    pub silenced_by: Option<SilenceId>,
}

impl Alert {
    /// Create a new firing alert.
    pub fn new(name: impl Into<String>, severity: AlertSeverity) -> Self {
        let name = name.into();
        let labels = BTreeMap::new();
        let fingerprint = Fingerprint::compute(&name, &labels);
        Self {
            id: AlertId::generate(),
            name,
            severity,
            status: AlertStatus::Firing,
            description: String::new(),
            labels,
            annotations: BTreeMap::new(),
            starts_at: Utc::now(),
            ends_at: None,
            fingerprint,
            silenced_by: None,
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Add a label. Recomputes the fingerprint.
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self.fingerprint = Fingerprint::compute(&self.name, &self.labels);
        self
    }

    /// Shorthand for the conventional `service` label.
    pub fn with_service(self, service: impl Into<String>) -> Self {
        self.with_label("service", service)
    }

    /// Add an annotation.
    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations.insert(key.into(), value.into());
        self
    }

    /// Set the status.
    pub fn with_status(mut self, status: AlertStatus) -> Self {
        self.status = status;
        self
    }

    /// The `service` label, if present.
    pub fn service(&self) -> Option<&str> {
        self.labels.get("service").map(String::as_str)
    }

    /// The `instance` label, if present.
    pub fn instance(&self) -> Option<&str> {
        self.labels.get("instance").map(String::as_str)
    }

    /// Whether an acknowledgement annotation is present.
    pub fn is_acknowledged(&self) -> bool {
        self.annotations.contains_key(ACK_ANNOTATION)
    }

    /// How long the alert has been firing.
    pub fn duration(&self, now: DateTime<Utc>) -> chrono::Duration {
        self.ends_at.unwrap_or(now) - self.starts_at
    }

    /// Mark the alert resolved at the given time.
    pub fn resolve(&mut self, at: DateTime<Utc>) {
        self.status = AlertStatus::Resolved;
        self.ends_at = Some(at);
    }
}
