//! Alert rules and escalation policies.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::alert::AlertSeverity;
use crate::channel::ChannelKind;
use crate::ids::RuleId;

/// A configured alert rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRule {
    /// Rule id.
    pub id: RuleId,

    /// Alert name produced by this rule. Escalation policies are looked up
    /// by this name when an alert fires.
    pub name: String,

    /// Reference to the match expression evaluated by the rule-evaluation
    /// collaborator. Opaque to the core.
    pub expression: String,

    /// Severity of alerts produced by this rule.
    pub severity: AlertSeverity,

    /// How long the condition must hold before the alert fires.
    pub duration: Duration,

    /// Label templates applied to produced alerts.
    pub labels: BTreeMap<String, String>,

    /// Annotation templates applied to produced alerts.
    pub annotations: BTreeMap<String, String>,

    /// Whether the rule is active.
    pub enabled: bool,

    /// Escalation policy for alerts produced by this rule.
    pub escalation: Option<EscalationPolicy>,
}

impl AlertRule {
    /// Create an enabled rule with no labels, annotations, or escalation.
    pub fn new(
        id: RuleId,
        name: impl Into<String>,
        expression: impl Into<String>,
        severity: AlertSeverity,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            expression: expression.into(),
            severity,
            duration: Duration::ZERO,
            labels: BTreeMap::new(),
            annotations: BTreeMap::new(),
            enabled: true,
            escalation: None,
        }
    }

    /// Set the hold duration.
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Attach an escalation policy.
    pub fn with_escalation(mut self, policy: EscalationPolicy) -> Self {
        self.escalation = Some(policy);
        self
    }
}

/// Ordered escalation stages for a rule's alerts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EscalationPolicy {
    /// Steps, scheduled relative to the alert's firing time.
    pub steps: Vec<EscalationStep>,
}

impl EscalationPolicy {
    pub fn new(steps: Vec<EscalationStep>) -> Self {
        Self { steps }
    }
}

/// One timed notification stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalationStep {
    /// Delay after the alert fires before this step runs.
    pub delay: Duration,

    /// Channels to notify.
    pub channels: Vec<ChannelKind>,

    /// Optional guard condition, e.g. `severity=critical`, `duration>10m`,
    /// `ack_count=0`. Evaluated against the alert when the step fires;
    /// the step is skipped silently when it does not hold.
    pub condition: Option<String>,
}

impl EscalationStep {
    pub fn new(delay: Duration, channels: Vec<ChannelKind>) -> Self {
        Self {
            delay,
            channels,
            condition: None,
        }
    }

    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_builder() {
        let rule = AlertRule::new(
            RuleId::new("service-down"),
            "ServiceDown",
            "up == 0",
            AlertSeverity::Critical,
        )
        .with_duration(Duration::from_secs(60))
        .with_escalation(EscalationPolicy::new(vec![
            EscalationStep::new(Duration::from_secs(300), vec![ChannelKind::Slack]),
            EscalationStep::new(Duration::from_secs(900), vec![ChannelKind::Pagerduty])
                .with_condition("severity=critical"),
        ]));

        assert!(rule.enabled);
        let policy = rule.escalation.unwrap();
        assert_eq!(policy.steps.len(), 2);
        assert!(policy.steps[1].condition.is_some());
    }
}
