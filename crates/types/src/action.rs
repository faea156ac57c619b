//! Remediation actions and their execution history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::time::Duration;

use crate::ids::ActionId;

/// Default per-step timeout.
pub const DEFAULT_STEP_TIMEOUT: Duration = Duration::from_secs(60);

/// Default attempt count per step (a single attempt, no retry).
pub const DEFAULT_STEP_RETRIES: u32 = 1;

/// Cap on the rolling failure-timestamp window kept per action.
const RECENT_FAILURE_CAP: usize = 50;

/// Comparison operator for metric-threshold triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdOp {
    /// `>`
    Gt,
    /// `<`
    Lt,
    /// `>=`
    Ge,
    /// `<=`
    Le,
    /// `=`
    Eq,
}

impl ThresholdOp {
    /// Apply the comparison to an observed value.
    pub fn compare(self, observed: f64, threshold: f64) -> bool {
        match self {
            ThresholdOp::Gt => observed > threshold,
            ThresholdOp::Lt => observed < threshold,
            ThresholdOp::Ge => observed >= threshold,
            ThresholdOp::Le => observed <= threshold,
            ThresholdOp::Eq => (observed - threshold).abs() < f64::EPSILON,
        }
    }

    /// Parse from the symbolic form used in trigger configuration.
    pub fn parse(symbol: &str) -> Option<Self> {
        match symbol {
            ">" => Some(ThresholdOp::Gt),
            "<" => Some(ThresholdOp::Lt),
            ">=" => Some(ThresholdOp::Ge),
            "<=" => Some(ThresholdOp::Le),
            "=" | "==" => Some(ThresholdOp::Eq),
            _ => None,
        }
    }
}

impl fmt::Display for ThresholdOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThresholdOp::Gt => write!(f, ">"),
            ThresholdOp::Lt => write!(f, "<"),
            ThresholdOp::Ge => write!(f, ">="),
            ThresholdOp::Le => write!(f, "<="),
            ThresholdOp::Eq => write!(f, "="),
        }
    }
}

/// What causes a remediation action to be considered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionTrigger {
    /// Exact alert-name equality.
    AlertName(String),

    /// Metric-threshold comparison.
    MetricThreshold {
        metric: String,
        op: ThresholdOp,
        value: f64,
    },
}

impl ActionTrigger {
    /// Whether an alert with this name matches.
    pub fn matches_alert(&self, alert_name: &str) -> bool {
        matches!(self, ActionTrigger::AlertName(name) if name == alert_name)
    }

    /// Whether a metric observation matches.
    pub fn matches_metric(&self, metric: &str, observed: f64) -> bool {
        match self {
            ActionTrigger::MetricThreshold {
                metric: name,
                op,
                value,
            } => name == metric && op.compare(observed, *value),
            ActionTrigger::AlertName(_) => false,
        }
    }
}

/// Kind of a remediation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepKind {
    /// Rolling restart of a deployment.
    Restart,

    /// Replica count change.
    Scale,

    /// Templated HTTP call.
    Webhook,

    /// External process with templated arguments.
    Script,

    /// Remediation notification message.
    Notification,
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepKind::Restart => write!(f, "restart"),
            StepKind::Scale => write!(f, "scale"),
            StepKind::Webhook => write!(f, "webhook"),
            StepKind::Script => write!(f, "script"),
            StepKind::Notification => write!(f, "notification"),
        }
    }
}

/// One step of a remediation action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemediationStep {
    /// Step kind.
    pub kind: StepKind,

    /// Kind-specific configuration. String values may contain `${a.b.c}`
    /// placeholders resolved against the triggering context.
    pub config: BTreeMap<String, serde_json::Value>,

    /// Timeout for one attempt of this step.
    pub timeout: Duration,

    /// Attempts allowed for this step.
    pub retries: u32,
}

impl RemediationStep {
    /// Create a step with default timeout and a single attempt.
    pub fn new(kind: StepKind) -> Self {
        Self {
            kind,
            config: BTreeMap::new(),
            timeout: DEFAULT_STEP_TIMEOUT,
            retries: DEFAULT_STEP_RETRIES,
        }
    }

    /// Set a config entry.
    pub fn with_config(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.config.insert(key.into(), value);
        self
    }

    /// Set the attempt count.
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries.max(1);
        self
    }

    /// Set the per-attempt timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Fetch a config value as a string.
    pub fn config_str(&self, key: &str) -> Option<&str> {
        self.config.get(key).and_then(|v| v.as_str())
    }
}

/// A configured remediation action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemediationAction {
    /// Action id.
    pub id: ActionId,

    /// Human-readable name.
    pub name: String,

    /// Trigger condition.
    pub trigger: ActionTrigger,

    /// Steps, executed strictly in order.
    pub steps: Vec<RemediationStep>,

    /// Whether the action may execute.
    pub enabled: bool,

    /// Minimum time between two executions.
    pub cooldown: Duration,
}

impl RemediationAction {
    pub fn new(id: ActionId, name: impl Into<String>, trigger: ActionTrigger) -> Self {
        Self {
            id,
            name: name.into(),
            trigger,
            steps: Vec::new(),
            enabled: true,
            cooldown: Duration::from_secs(300),
        }
    }

    pub fn with_step(mut self, step: RemediationStep) -> Self {
        self.steps.push(step);
        self
    }

    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }
}

/// Per-action execution bookkeeping. Persisted so that cooldowns survive
/// restarts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionHistory {
    /// Time of the last execution attempt (successful or not).
    pub last_executed: Option<DateTime<Utc>>,

    /// Consecutive successful executions.
    pub consecutive_successes: u32,

    /// Consecutive failed executions.
    pub consecutive_failures: u32,

    /// Timestamps of recent failures, bounded.
    pub recent_failures: VecDeque<DateTime<Utc>>,
}

impl ExecutionHistory {
    /// Record a successful execution. Resets the failure streak; the
    /// success streak grows.
    pub fn record_success(&mut self, at: DateTime<Utc>) {
        self.last_executed = Some(at);
        self.consecutive_successes += 1;
        self.consecutive_failures = 0;
    }

    /// Record a failed execution. Grows the failure streak without
    /// touching the success streak (asymmetry preserved from the source
    /// system).
    pub fn record_failure(&mut self, at: DateTime<Utc>) {
        self.last_executed = Some(at);
        self.consecutive_failures += 1;
        self.recent_failures.push_back(at);
        while self.recent_failures.len() > RECENT_FAILURE_CAP {
            self.recent_failures.pop_front();
        }
    }

    /// Whether the action is still inside its cooldown window.
    pub fn in_cooldown(&self, cooldown: Duration, now: DateTime<Utc>) -> bool {
        match self.last_executed {
            None => false,
            Some(last) => {
                let elapsed = now.signed_duration_since(last);
                elapsed.to_std().map(|d| d < cooldown).unwrap_or(true)
            }
        }
    }

    /// Count failures inside the rolling window ending at `now`.
    pub fn failures_within(&self, window: Duration, now: DateTime<Utc>) -> usize {
        let window = chrono::Duration::from_std(window).unwrap_or(chrono::Duration::MAX);
        self.recent_failures
            .iter()
            .filter(|t| now.signed_duration_since(**t) <= window)
            .count()
    }
}
