//! Control-loop metric collectors.
//!
//! One collector struct per concern, registered against the shared
//! registry at construction. Components call the `record_*` methods;
//! registration failures are impossible after construction, so the
//! recording path is infallible.

use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry};

/// Metrics recorded by the core control loop.
#[derive(Clone)]
pub struct CoreMetrics {
    anomalies: IntCounterVec,
    alert_transitions: IntCounterVec,
    suppressions: IntCounterVec,
    escalations: IntCounterVec,
    remediations: IntCounterVec,
    remediation_duration: HistogramVec,
    autoscale_operations: IntCounterVec,
}

impl CoreMetrics {
    /// Create and register all collectors.
    pub fn new(registry: &Registry) -> Self {
        let anomalies = IntCounterVec::new(
            Opts::new("anomalies_detected_total", "Anomaly events by severity"),
            &["severity"],
        )
        .expect("valid metric definition");

        let alert_transitions = IntCounterVec::new(
            Opts::new(
                "alert_transitions_total",
                "Alert lifecycle transitions by kind and severity",
            ),
            &["transition", "severity"],
        )
        .expect("valid metric definition");

        let suppressions = IntCounterVec::new(
            Opts::new(
                "alert_suppressions_total",
                "Alert events dropped by the suppression pipeline",
            ),
            &["reason"],
        )
        .expect("valid metric definition");

        let escalations = IntCounterVec::new(
            Opts::new("escalations_total", "Escalation notifications by channel"),
            &["channel"],
        )
        .expect("valid metric definition");

        let remediations = IntCounterVec::new(
            Opts::new(
                "remediations_total",
                "Remediation action executions by action and outcome",
            ),
            &["action", "outcome"],
        )
        .expect("valid metric definition");

        let remediation_duration = HistogramVec::new(
            HistogramOpts::new(
                "remediation_duration_seconds",
                "Wall-clock duration of remediation action executions",
            ),
            &["action"],
        )
        .expect("valid metric definition");

        let autoscale_operations = IntCounterVec::new(
            Opts::new(
                "autoscale_operations_total",
                "Autoscaling operations by service and direction",
            ),
            &["service", "direction"],
        )
        .expect("valid metric definition");

        for collector in [
            &anomalies,
            &alert_transitions,
            &suppressions,
            &escalations,
            &remediations,
            &autoscale_operations,
        ] {
            registry
                .register(Box::new(collector.clone()))
                .expect("collector registers once");
        }
        registry
            .register(Box::new(remediation_duration.clone()))
            .expect("collector registers once");

        Self {
            anomalies,
            alert_transitions,
            suppressions,
            escalations,
            remediations,
            remediation_duration,
            autoscale_operations,
        }
    }

    /// Record a detected anomaly.
    pub fn record_anomaly(&self, severity: &str) {
        self.anomalies.with_label_values(&[severity]).inc();
    }

    /// Record an alert lifecycle transition.
    pub fn record_alert_transition(&self, transition: &str, severity: &str) {
        self.alert_transitions
            .with_label_values(&[transition, severity])
            .inc();
    }

    /// Record an alert dropped by suppression.
    pub fn record_suppression(&self, reason: &str) {
        self.suppressions.with_label_values(&[reason]).inc();
    }

    /// Record an escalation notification.
    pub fn record_escalation(&self, channel: &str) {
        self.escalations.with_label_values(&[channel]).inc();
    }

    /// Record a remediation execution and its duration.
    pub fn record_remediation(&self, action: &str, outcome: &str, duration_secs: f64) {
        self.remediations
            .with_label_values(&[action, outcome])
            .inc();
        self.remediation_duration
            .with_label_values(&[action])
            .observe(duration_secs);
    }

    /// Record an autoscaling operation.
    pub fn record_autoscaling(&self, service: &str, direction: &str) {
        self.autoscale_operations
            .with_label_values(&[service, direction])
            .inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collectors_register_and_record() {
        let registry = Registry::new();
        let metrics = CoreMetrics::new(&registry);

        metrics.record_anomaly("high");
        metrics.record_alert_transition("firing", "critical");
        metrics.record_suppression("flapping");
        metrics.record_escalation("slack");
        metrics.record_remediation("restart-api", "success", 1.5);
        metrics.record_autoscaling("api", "up");

        let families = registry.gather();
        assert!(families
            .iter()
            .any(|f| f.get_name() == "remediations_total"));
    }
}
