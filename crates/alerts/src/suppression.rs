//! Suppression pipeline building blocks.
//!
//! Each stage may drop an alert event before it reaches the state
//! machine: rate limiting, dependency suppression, maintenance windows,
//! and flap damping. Silences are checked by the manager before any of
//! these run.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::time::Duration;

use vigil_types::{Alert, AlertSeverity, AlertStatus, Fingerprint};

/// Why an alert event was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuppressReason {
    Silenced,
    RateLimited,
    Dependency,
    Maintenance,
    Flapping,
}

impl SuppressReason {
    /// Label used on the suppression counter.
    pub fn as_str(self) -> &'static str {
        match self {
            SuppressReason::Silenced => "silenced",
            SuppressReason::RateLimited => "rate_limited",
            SuppressReason::Dependency => "dependency",
            SuppressReason::Maintenance => "maintenance",
            SuppressReason::Flapping => "flapping",
        }
    }
}

impl fmt::Display for SuppressReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-fingerprint rolling-window event counter.
pub struct RateLimiter {
    window: Duration,
    max_events: usize,
    counters: DashMap<Fingerprint, VecDeque<DateTime<Utc>>>,
}

impl RateLimiter {
    pub fn new(window: Duration, max_events: usize) -> Self {
        Self {
            window,
            max_events,
            counters: DashMap::new(),
        }
    }

    /// Check the limit and, when below it, record the event. Returns
    /// true when the event must be dropped.
    pub fn check_and_record(&self, fingerprint: &Fingerprint, now: DateTime<Utc>) -> bool {
        let window = chrono::Duration::from_std(self.window).unwrap_or(chrono::Duration::MAX);
        let mut entry = self.counters.entry(fingerprint.clone()).or_default();
        while let Some(front) = entry.front() {
            if now.signed_duration_since(*front) > window {
                entry.pop_front();
            } else {
                break;
            }
        }
        if entry.len() >= self.max_events {
            return true;
        }
        entry.push_back(now);
        false
    }
}

/// Static parent → children suppression map.
///
/// While a parent alert is active for a service, its child alerts for
/// the same service (and instance, when both carry one) are dropped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyMap {
    parents: HashMap<String, Vec<String>>,
}

impl DependencyMap {
    pub fn new() -> Self {
        Self {
            parents: HashMap::new(),
        }
    }

    /// Register children suppressed by a parent alert name.
    pub fn add(&mut self, parent: impl Into<String>, children: Vec<String>) {
        self.parents.entry(parent.into()).or_default().extend(children);
    }

    /// Whether `candidate` is suppressed given the currently active
    /// alerts.
    pub fn suppresses<'a>(
        &self,
        candidate: &Alert,
        active: impl Iterator<Item = &'a Alert>,
    ) -> bool {
        for parent in active {
            let children = match self.parents.get(&parent.name) {
                Some(children) => children,
                None => continue,
            };
            if !children.iter().any(|c| c == &candidate.name) {
                continue;
            }
            if parent.service() != candidate.service() {
                continue;
            }
            if let (Some(parent_instance), Some(candidate_instance)) =
                (parent.instance(), candidate.instance())
            {
                if parent_instance != candidate_instance {
                    continue;
                }
            }
            return true;
        }
        false
    }
}

impl Default for DependencyMap {
    fn default() -> Self {
        let mut map = Self::new();
        map.add(
            "ServiceDown",
            vec![
                "HighLatency".to_string(),
                "HighErrorRate".to_string(),
                "LowSuccessRate".to_string(),
            ],
        );
        map
    }
}

/// A scheduled maintenance window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaintenanceWindow {
    /// Window id, for removal.
    pub id: String,

    /// Start of the window.
    pub starts_at: DateTime<Utc>,

    /// End of the window.
    pub ends_at: DateTime<Utc>,

    /// Services in scope; empty means all.
    pub services: Vec<String>,

    /// Severities in scope; empty means all.
    pub severities: Vec<AlertSeverity>,
}

impl MaintenanceWindow {
    /// Whether the window covers the alert at the given time.
    pub fn matches(&self, alert: &Alert, now: DateTime<Utc>) -> bool {
        if now < self.starts_at || now >= self.ends_at {
            return false;
        }
        if !self.services.is_empty() {
            match alert.service() {
                Some(service) if self.services.iter().any(|s| s == service) => {}
                _ => return false,
            }
        }
        if !self.severities.is_empty() && !self.severities.contains(&alert.severity) {
            return false;
        }
        true
    }
}

/// One recorded lifecycle transition, persisted with the flap history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlapEvent {
    pub at: DateTime<Utc>,
    pub status: AlertStatus,
}

/// Persisted flap history for one fingerprint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlapHistory {
    pub fingerprint: Fingerprint,
    pub events: Vec<FlapEvent>,
}

/// Per-fingerprint transition history used for flap damping.
pub struct FlapTracker {
    window: Duration,
    max_transitions: usize,
    capacity: usize,
    retention: Duration,
    histories: DashMap<Fingerprint, VecDeque<FlapEvent>>,
}

impl FlapTracker {
    pub fn new(
        window: Duration,
        max_transitions: usize,
        capacity: usize,
        retention: Duration,
    ) -> Self {
        Self {
            window,
            max_transitions,
            capacity,
            retention,
            histories: DashMap::new(),
        }
    }

    /// Record a lifecycle transition.
    pub fn record(&self, fingerprint: &Fingerprint, status: AlertStatus, now: DateTime<Utc>) {
        let retention =
            chrono::Duration::from_std(self.retention).unwrap_or(chrono::Duration::MAX);
        let mut entry = self.histories.entry(fingerprint.clone()).or_default();
        entry.push_back(FlapEvent { at: now, status });
        while entry.len() > self.capacity {
            entry.pop_front();
        }
        while let Some(front) = entry.front() {
            if now.signed_duration_since(front.at) > retention {
                entry.pop_front();
            } else {
                break;
            }
        }
    }

    /// Whether a new transition now would hit the flap ceiling: the
    /// candidate counts as one more transition, and the ceiling is
    /// reached at `max_transitions` inside the window.
    pub fn is_flapping(&self, fingerprint: &Fingerprint, now: DateTime<Utc>) -> bool {
        let window = chrono::Duration::from_std(self.window).unwrap_or(chrono::Duration::MAX);
        let recent = self
            .histories
            .get(fingerprint)
            .map(|h| {
                h.iter()
                    .filter(|e| now.signed_duration_since(e.at) <= window)
                    .count()
            })
            .unwrap_or(0);
        recent + 1 >= self.max_transitions
    }

    /// Export all histories for persistence.
    pub fn snapshot(&self) -> Vec<FlapHistory> {
        self.histories
            .iter()
            .map(|entry| FlapHistory {
                fingerprint: entry.key().clone(),
                events: entry.value().iter().cloned().collect(),
            })
            .collect()
    }

    /// Restore one fingerprint's history.
    pub fn restore(&self, history: FlapHistory) {
        self.histories
            .insert(history.fingerprint, history.events.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_types::AlertSeverity;

    #[test]
    fn test_rate_limiter_drops_above_ceiling() {
        let limiter = RateLimiter::new(Duration::from_secs(300), 3);
        let fp = Fingerprint::compute("X", &Default::default());
        let now = Utc::now();

        assert!(!limiter.check_and_record(&fp, now));
        assert!(!limiter.check_and_record(&fp, now));
        assert!(!limiter.check_and_record(&fp, now));
        assert!(limiter.check_and_record(&fp, now));

        // Outside the window the counter resets.
        let later = now + chrono::Duration::seconds(301);
        assert!(!limiter.check_and_record(&fp, later));
    }

    #[test]
    fn test_dependency_suppression_scoped_to_service() {
        let deps = DependencyMap::default();
        let parent = Alert::new("ServiceDown", AlertSeverity::Critical).with_service("api");
        let child_same = Alert::new("HighLatency", AlertSeverity::Warning).with_service("api");
        let child_other = Alert::new("HighLatency", AlertSeverity::Warning).with_service("web");
        let unrelated = Alert::new("DiskFull", AlertSeverity::Warning).with_service("api");

        let active = vec![parent];
        assert!(deps.suppresses(&child_same, active.iter()));
        assert!(!deps.suppresses(&child_other, active.iter()));
        assert!(!deps.suppresses(&unrelated, active.iter()));
    }

    #[test]
    fn test_maintenance_window_scope() {
        let now = Utc::now();
        let window = MaintenanceWindow {
            id: "w1".to_string(),
            starts_at: now - chrono::Duration::minutes(5),
            ends_at: now + chrono::Duration::minutes(55),
            services: vec!["api".to_string()],
            severities: vec![AlertSeverity::Warning],
        };

        let in_scope = Alert::new("HighLatency", AlertSeverity::Warning).with_service("api");
        let wrong_service = Alert::new("HighLatency", AlertSeverity::Warning).with_service("web");
        let wrong_severity = Alert::new("ServiceDown", AlertSeverity::Critical).with_service("api");

        assert!(window.matches(&in_scope, now));
        assert!(!window.matches(&wrong_service, now));
        assert!(!window.matches(&wrong_severity, now));
        assert!(!window.matches(&in_scope, now + chrono::Duration::hours(2)));
    }

    #[test]
    fn test_flap_ceiling() {
        let tracker = FlapTracker::new(
            Duration::from_secs(600),
            5,
            20,
            Duration::from_secs(3600),
        );
        let fp = Fingerprint::compute("X", &Default::default());
        let now = Utc::now();

        // firing, resolved, firing, resolved recorded; the fifth
        // transition hits the ceiling.
        for status in [
            AlertStatus::Firing,
            AlertStatus::Resolved,
            AlertStatus::Firing,
        ] {
            assert!(!tracker.is_flapping(&fp, now));
            tracker.record(&fp, status, now);
        }
        tracker.record(&fp, AlertStatus::Resolved, now);
        assert!(tracker.is_flapping(&fp, now));

        // Outside the window the same history is harmless.
        assert!(!tracker.is_flapping(&fp, now + chrono::Duration::minutes(11)));
    }
}
