//! Core types for the Vigil operations control loop.
//!
//! This crate defines the shared data model used by every Vigil subsystem:
//! strongly-typed identifiers, metric keys, alerts and their lifecycle
//! states, alert rules with escalation policies, remediation actions,
//! autoscaling configuration, and the closed set of typed internal events
//! that flow between the anomaly engine, the alert lifecycle manager, and
//! the remediation orchestrator.

pub mod action;
pub mod alert;
pub mod autoscale;
pub mod channel;
pub mod events;
pub mod ids;
pub mod metric;
pub mod rule;

pub use action::{
    ActionTrigger, ExecutionHistory, RemediationAction, RemediationStep, StepKind, ThresholdOp,
};
pub use alert::{Alert, AlertSeverity, AlertStatus, Fingerprint, ACK_ANNOTATION};
pub use autoscale::{AutoscalingConfig, ScaleDirection};
pub use channel::ChannelKind;
pub use events::{AlertStateChange, AnomalyEvent, AnomalySeverity, MetricThresholdExceeded};
pub use ids::{ActionId, AlertId, EventId, RuleId, SilenceId};
pub use metric::{MetricKey, MetricSample};
pub use rule::{AlertRule, EscalationPolicy, EscalationStep};
