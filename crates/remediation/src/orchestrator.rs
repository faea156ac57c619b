//! Remediation orchestrator.
//!
//! Matches actions to alert state changes and metric threshold
//! crossings, gates execution (cooldown, zero-success circuit ceiling,
//! rolling failure window), and runs each action's steps strictly in
//! sequence. A step exhausting its attempts aborts the whole action,
//! records the failure, and emits a sanitized failure notification.
//! Failures never propagate to the caller of the handle methods.

use chrono::Utc;
use dashmap::DashMap;
use serde_json::{json, Value};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use vigil_infra::{HttpRequest, InfraControl};
use vigil_notify::{NotificationMessage, Notifier};
use vigil_observability::CoreMetrics;
use vigil_state::{keys, KeyValueStore};
use vigil_types::{
    ActionId, AlertSeverity, AlertStateChange, AutoscalingConfig, ChannelKind, RemediationAction,
    RemediationStep, StepKind,
};

use crate::autoscaler::{Autoscaler, ScaleDecision};
use crate::config::OrchestratorConfig;
use crate::error::{RemediationError, Result};
use crate::ledger::ExecutionLedger;
use crate::sanitize;
use crate::template;

/// Why an action was not executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Action is disabled.
    Disabled,

    /// Still inside the cooldown window.
    Cooldown,

    /// Failures accumulated with zero lifetime successes; the action is
    /// considered permanently broken.
    CircuitOpen,

    /// Too many failures inside the rolling window.
    RollingFailures,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Disabled => write!(f, "disabled"),
            SkipReason::Cooldown => write!(f, "cooldown"),
            SkipReason::CircuitOpen => write!(f, "circuit_open"),
            SkipReason::RollingFailures => write!(f, "rolling_failures"),
        }
    }
}

/// Outcome of considering one action.
#[derive(Debug)]
pub enum ActionOutcome {
    /// The action ran to completion or aborted on a failing step.
    Executed {
        action: ActionId,
        success: bool,
        duration_ms: u64,
    },

    /// Gating skipped the action.
    Skipped { action: ActionId, reason: SkipReason },
}

impl ActionOutcome {
    /// Whether the action executed successfully.
    pub fn is_success(&self) -> bool {
        matches!(self, ActionOutcome::Executed { success: true, .. })
    }
}

enum ScaleRequest {
    Absolute(u32),
    Delta(i64),
}

/// Remediation action selection and execution.
pub struct RemediationOrchestrator {
    config: OrchestratorConfig,
    actions: DashMap<ActionId, RemediationAction>,
    ledger: ExecutionLedger,
    autoscaler: Autoscaler,
    infra: Arc<dyn InfraControl>,
    notifier: Arc<dyn Notifier>,
    store: Arc<dyn KeyValueStore>,
    metrics: CoreMetrics,
    locks: DashMap<ActionId, Arc<tokio::sync::Mutex<()>>>,
}

impl RemediationOrchestrator {
    pub fn new(
        config: OrchestratorConfig,
        infra: Arc<dyn InfraControl>,
        notifier: Arc<dyn Notifier>,
        store: Arc<dyn KeyValueStore>,
        metrics: CoreMetrics,
    ) -> Self {
        let ledger = ExecutionLedger::new(store.clone());
        let autoscaler = Autoscaler::new(infra.clone(), store.clone(), metrics.clone());
        Self {
            config,
            actions: DashMap::new(),
            ledger,
            autoscaler,
            infra,
            notifier,
            store,
            metrics,
            locks: DashMap::new(),
        }
    }

    /// React to an alert state change. Only fresh firings trigger
    /// actions.
    pub async fn handle_alert_state_change(&self, event: &AlertStateChange) -> Vec<ActionOutcome> {
        if !event.is_new_firing() {
            return Vec::new();
        }

        let ctx = json!({
            "alert": event.alert,
            "transition": {
                "previous": event.previous,
                "current": event.current,
                "occurred_at": event.occurred_at,
            }
        });

        let matching: Vec<RemediationAction> = self
            .actions
            .iter()
            .filter(|a| a.trigger.matches_alert(&event.alert.name))
            .map(|a| a.clone())
            .collect();

        let mut outcomes = Vec::with_capacity(matching.len());
        for action in matching {
            outcomes.push(self.run_action(action, &ctx).await);
        }
        outcomes
    }

    /// React to a metric observation: threshold-triggered actions plus
    /// the autoscaling policy for the sample's service.
    pub async fn handle_metric_threshold(
        &self,
        metric: &str,
        value: f64,
        service: Option<&str>,
    ) -> Vec<ActionOutcome> {
        let ctx = json!({
            "metric": {
                "name": metric,
                "value": value,
                "service": service,
            }
        });

        let matching: Vec<RemediationAction> = self
            .actions
            .iter()
            .filter(|a| a.trigger.matches_metric(metric, value))
            .map(|a| a.clone())
            .collect();

        let mut outcomes = Vec::with_capacity(matching.len());
        for action in matching {
            outcomes.push(self.run_action(action, &ctx).await);
        }

        if let Some(service) = service {
            self.autoscaler.evaluate(service, metric, value).await;
        }

        outcomes
    }

    /// Evaluate autoscaling for a sample without running actions.
    pub async fn evaluate_autoscaling(
        &self,
        service: &str,
        metric: &str,
        value: f64,
    ) -> Option<ScaleDecision> {
        self.autoscaler.evaluate(service, metric, value).await
    }

    /// Register or replace an action.
    pub fn add_action(&self, action: RemediationAction) {
        self.actions.insert(action.id.clone(), action);
    }

    /// Remove an action by id.
    pub fn remove_action(&self, action_id: &ActionId) -> Option<RemediationAction> {
        self.actions.remove(action_id).map(|(_, action)| action)
    }

    /// Registered actions.
    pub fn actions(&self) -> Vec<RemediationAction> {
        self.actions.iter().map(|a| a.clone()).collect()
    }

    /// Execution history for one action.
    pub fn history(&self, action_id: &ActionId) -> vigil_types::ExecutionHistory {
        self.ledger.get(action_id)
    }

    /// Install or replace an autoscaling config.
    pub fn upsert_autoscaling_config(&self, config: AutoscalingConfig) {
        self.autoscaler.upsert_config(config);
    }

    /// Remove a service's autoscaling config.
    pub fn remove_autoscaling_config(&self, service: &str) {
        self.autoscaler.remove_config(service);
    }

    /// Persist actions, execution history, and autoscaling state.
    pub async fn flush(&self) {
        let actions = self.actions();
        for action in actions {
            let key = keys::action_key(&action.id);
            match serde_json::to_value(&action) {
                Ok(value) => {
                    if let Err(err) = self.store.put(&key, value, None).await {
                        warn!(key = %key, error = %err, "action flush failed");
                    }
                }
                Err(err) => warn!(key = %key, error = %err, "action serialize failed"),
            }
        }
        self.ledger.flush().await;
        self.autoscaler.flush().await;
    }

    /// Reload actions, execution history, and autoscaling state.
    pub async fn hydrate(&self) {
        if let Ok(action_keys) = self.store.keys_with_prefix(keys::ACTION_PREFIX).await {
            for key in action_keys {
                if let Ok(Some(value)) = self.store.get(&key).await {
                    match serde_json::from_value::<RemediationAction>(value) {
                        Ok(action) => self.add_action(action),
                        Err(err) => warn!(key = %key, error = %err, "action snapshot malformed"),
                    }
                }
            }
        }
        let ids: Vec<ActionId> = self.actions.iter().map(|a| a.id.clone()).collect();
        self.ledger.hydrate(&ids).await;
        self.autoscaler.hydrate().await;
    }

    async fn run_action(&self, action: RemediationAction, ctx: &Value) -> ActionOutcome {
        let lock = self
            .locks
            .entry(action.id.clone())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        if let Some(reason) = self.should_skip(&action) {
            debug!(action = %action.id, reason = %reason, "remediation skipped");
            return ActionOutcome::Skipped {
                action: action.id,
                reason,
            };
        }

        info!(action = %action.id, name = %action.name, "remediation starting");
        let started = Instant::now();

        for (index, step) in action.steps.iter().enumerate() {
            if let Err(err) = self.run_step(step, ctx).await {
                let duration = started.elapsed();
                warn!(
                    action = %action.id,
                    step = index,
                    kind = %step.kind,
                    error = %err,
                    "remediation aborted on failing step"
                );
                self.ledger.record_failure(&action.id, Utc::now());
                self.metrics
                    .record_remediation(&action.name, "failure", duration.as_secs_f64());
                self.notify_failure(&action, step, &err, ctx).await;
                return ActionOutcome::Executed {
                    action: action.id,
                    success: false,
                    duration_ms: duration.as_millis() as u64,
                };
            }
        }

        let duration = started.elapsed();
        self.ledger.record_success(&action.id, Utc::now());
        self.metrics
            .record_remediation(&action.name, "success", duration.as_secs_f64());
        info!(action = %action.id, duration_ms = duration.as_millis() as u64, "remediation succeeded");
        ActionOutcome::Executed {
            action: action.id,
            success: true,
            duration_ms: duration.as_millis() as u64,
        }
    }

    fn should_skip(&self, action: &RemediationAction) -> Option<SkipReason> {
        if !action.enabled {
            return Some(SkipReason::Disabled);
        }
        let now = Utc::now();
        let history = self.ledger.get(&action.id);
        if history.in_cooldown(action.cooldown, now) {
            return Some(SkipReason::Cooldown);
        }
        if history.consecutive_successes == 0
            && history.consecutive_failures >= self.config.circuit_failure_ceiling
        {
            return Some(SkipReason::CircuitOpen);
        }
        if history.failures_within(self.config.rolling_failure_window, now)
            >= self.config.rolling_failure_max
        {
            return Some(SkipReason::RollingFailures);
        }
        None
    }

    async fn run_step(&self, step: &RemediationStep, ctx: &Value) -> Result<()> {
        let attempts = step.retries.max(1);
        let mut last_error = RemediationError::StepFailed {
            kind: step.kind,
            reason: "no attempts made".to_string(),
        };

        for attempt in 1..=attempts {
            match tokio::time::timeout(step.timeout, self.dispatch(step, ctx)).await {
                Ok(Ok(())) => return Ok(()),
                Ok(Err(err)) => last_error = err,
                Err(_) => last_error = RemediationError::StepTimeout(step.timeout),
            }
            if attempt < attempts {
                // Linear backoff between attempts.
                tokio::time::sleep(self.config.backoff_base * attempt).await;
            }
        }
        Err(last_error)
    }

    async fn dispatch(&self, step: &RemediationStep, ctx: &Value) -> Result<()> {
        match step.kind {
            StepKind::Restart => {
                let service = self.required_str(step, "service", ctx)?;
                self.infra.restart_deployment(&service).await?;
                Ok(())
            }
            StepKind::Scale => {
                let service = self.required_str(step, "service", ctx)?;
                let spec = self.required_str(step, "replicas", ctx)?;
                let mode = step.config_str("mode").unwrap_or("scale-to");
                let request = parse_scale_request(mode, &spec)?;
                let target = match request {
                    ScaleRequest::Absolute(n) => n.max(1),
                    ScaleRequest::Delta(delta) => {
                        let current = self.infra.current_replicas(&service).await?;
                        apply_delta(current, delta)
                    }
                };
                self.infra.scale_deployment(&service, target).await?;
                Ok(())
            }
            StepKind::Webhook => {
                let url = self.required_str(step, "url", ctx)?;
                let method = self
                    .rendered_str(step, "method", ctx)
                    .unwrap_or_else(|| "POST".to_string());
                let mut request = HttpRequest::new(url, method);
                request.timeout = step.timeout;
                if let Some(headers) = step.config.get("headers").and_then(|v| v.as_object()) {
                    for (key, value) in headers {
                        if let Some(value) = value.as_str() {
                            request
                                .headers
                                .insert(key.clone(), template::render_str(value, ctx));
                        }
                    }
                }
                if let Some(body) = step.config.get("body") {
                    request.body = Some(template::render_value(body, ctx));
                }

                let response = self.infra.http_call(request).await?;
                if response.is_success() {
                    Ok(())
                } else {
                    Err(RemediationError::StepFailed {
                        kind: step.kind,
                        reason: format!("webhook returned status {}", response.status),
                    })
                }
            }
            StepKind::Script => {
                let command = self.required_str(step, "command", ctx)?;
                let args: Vec<String> = step
                    .config
                    .get("args")
                    .and_then(|v| v.as_array())
                    .map(|items| {
                        items
                            .iter()
                            .filter_map(|v| v.as_str())
                            .map(|s| template::render_str(s, ctx))
                            .collect()
                    })
                    .unwrap_or_default();

                let output = self.infra.execute_process(&command, &args).await?;
                if output.is_success() {
                    Ok(())
                } else {
                    let stderr: String = output.stderr.chars().take(200).collect();
                    Err(RemediationError::StepFailed {
                        kind: step.kind,
                        reason: format!(
                            "exit code {:?}: {}",
                            output.exit_code,
                            stderr.trim()
                        ),
                    })
                }
            }
            StepKind::Notification => {
                let body = self.required_str(step, "message", ctx)?;
                let channel = match self.rendered_str(step, "channel", ctx) {
                    Some(raw) => parse_channel(&raw).ok_or(RemediationError::StepFailed {
                        kind: step.kind,
                        reason: format!("unknown channel `{}`", raw),
                    })?,
                    None => ChannelKind::Slack,
                };
                let message = NotificationMessage::new(
                    "remediation",
                    body,
                    AlertSeverity::Warning,
                    "remediation",
                );
                self.notifier
                    .send(&message, channel, 0)
                    .await
                    .map_err(|err| RemediationError::StepFailed {
                        kind: step.kind,
                        reason: err.to_string(),
                    })
            }
        }
    }

    fn rendered_str(&self, step: &RemediationStep, key: &str, ctx: &Value) -> Option<String> {
        step.config_str(key).map(|raw| template::render_str(raw, ctx))
    }

    fn required_str(&self, step: &RemediationStep, key: &str, ctx: &Value) -> Result<String> {
        self.rendered_str(step, key, ctx)
            .ok_or_else(|| RemediationError::MissingConfig {
                kind: step.kind,
                key: key.to_string(),
            })
    }

    async fn notify_failure(
        &self,
        action: &RemediationAction,
        step: &RemediationStep,
        error: &RemediationError,
        ctx: &Value,
    ) {
        let body = json!({
            "action": action.name,
            "step": step.kind.to_string(),
            "error": error.to_string(),
            "context": sanitize::sanitize(ctx),
        });
        let message = NotificationMessage::new(
            format!("remediation failed: {}", action.name),
            body.to_string(),
            AlertSeverity::Warning,
            "remediation",
        );
        for channel in &self.config.failure_channels {
            if let Err(err) = self.notifier.send(&message, *channel, 0).await {
                warn!(channel = %channel, error = %err, "failure notification undeliverable");
            }
        }
    }
}

fn parse_channel(raw: &str) -> Option<ChannelKind> {
    match raw.to_ascii_lowercase().as_str() {
        "email" => Some(ChannelKind::Email),
        "slack" => Some(ChannelKind::Slack),
        "webhook" => Some(ChannelKind::Webhook),
        "pagerduty" => Some(ChannelKind::Pagerduty),
        "sms" => Some(ChannelKind::Sms),
        _ => None,
    }
}

fn parse_scale_request(mode: &str, spec: &str) -> Result<ScaleRequest> {
    let trimmed = spec.trim();
    let parse_error = || RemediationError::StepFailed {
        kind: StepKind::Scale,
        reason: format!("unparseable replica spec `{}`", spec),
    };

    match mode {
        "scale-up" => trimmed
            .trim_start_matches('+')
            .parse::<i64>()
            .map(|n| ScaleRequest::Delta(n.abs()))
            .map_err(|_| parse_error()),
        "scale-down" => trimmed
            .trim_start_matches('-')
            .trim_start_matches('+')
            .parse::<i64>()
            .map(|n| ScaleRequest::Delta(-n.abs()))
            .map_err(|_| parse_error()),
        _ => {
            // scale-to takes an absolute count, or a signed delta when
            // the value carries an explicit sign.
            if trimmed.starts_with('+') || trimmed.starts_with('-') {
                trimmed
                    .parse::<i64>()
                    .map(ScaleRequest::Delta)
                    .map_err(|_| parse_error())
            } else {
                trimmed
                    .parse::<u32>()
                    .map(ScaleRequest::Absolute)
                    .map_err(|_| parse_error())
            }
        }
    }
}

fn apply_delta(current: u32, delta: i64) -> u32 {
    (current as i64 + delta).max(1) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use vigil_infra::{InfraCall, MemoryInfra};
    use vigil_notify::MemoryNotifier;
    use vigil_observability::MetricsRegistry;
    use vigil_state::MemoryStore;
    use vigil_types::{ActionTrigger, Alert, AlertStatus, ThresholdOp};

    struct Harness {
        orchestrator: RemediationOrchestrator,
        infra: Arc<MemoryInfra>,
        notifier: Arc<MemoryNotifier>,
    }

    fn harness(config: OrchestratorConfig) -> Harness {
        let infra = Arc::new(MemoryInfra::new());
        let notifier = Arc::new(MemoryNotifier::new());
        let orchestrator = RemediationOrchestrator::new(
            config,
            infra.clone(),
            notifier.clone(),
            Arc::new(MemoryStore::new()),
            MetricsRegistry::new().core().clone(),
        );
        Harness {
            orchestrator,
            infra,
            notifier,
        }
    }

    fn firing_event(name: &str, service: &str) -> AlertStateChange {
        let alert = Alert::new(name, AlertSeverity::Critical).with_service(service);
        AlertStateChange {
            alert,
            previous: None,
            current: AlertStatus::Firing,
            occurred_at: Utc::now(),
        }
    }

    fn restart_action(cooldown: Duration) -> RemediationAction {
        RemediationAction::new(
            ActionId::new("restart-api"),
            "restart api",
            ActionTrigger::AlertName("ServiceDown".to_string()),
        )
        .with_cooldown(cooldown)
        .with_step(
            RemediationStep::new(StepKind::Restart)
                .with_config("service", json!("${alert.labels.service}")),
        )
    }

    #[tokio::test]
    async fn test_cooldown_executes_exactly_once() {
        let h = harness(OrchestratorConfig::default());
        h.orchestrator
            .add_action(restart_action(Duration::from_secs(600)));

        let event = firing_event("ServiceDown", "api");
        let first = h.orchestrator.handle_alert_state_change(&event).await;
        assert!(first[0].is_success());

        let second = h.orchestrator.handle_alert_state_change(&event).await;
        assert!(matches!(
            second[0],
            ActionOutcome::Skipped {
                reason: SkipReason::Cooldown,
                ..
            }
        ));

        let restarts = h
            .infra
            .calls()
            .into_iter()
            .filter(|c| matches!(c, InfraCall::Restart { .. }))
            .count();
        assert_eq!(restarts, 1);
    }

    #[tokio::test]
    async fn test_template_resolves_service_from_alert() {
        let h = harness(OrchestratorConfig::default());
        h.orchestrator
            .add_action(restart_action(Duration::from_secs(600)));

        h.orchestrator
            .handle_alert_state_change(&firing_event("ServiceDown", "checkout"))
            .await;
        assert_eq!(
            h.infra.calls(),
            vec![InfraCall::Restart {
                service: "checkout".to_string()
            }]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_step_aborts_action_and_notifies() {
        let h = harness(OrchestratorConfig::default());
        h.infra.set_process_exit(1);

        let action = RemediationAction::new(
            ActionId::new("flush-cache"),
            "flush cache",
            ActionTrigger::AlertName("ServiceDown".to_string()),
        )
        .with_step(
            RemediationStep::new(StepKind::Script)
                .with_config("command", json!("/opt/vigil/flush.sh"))
                .with_config("args", json!(["${alert.labels.service}"]))
                .with_retries(2),
        )
        .with_step(
            RemediationStep::new(StepKind::Restart)
                .with_config("service", json!("${alert.labels.service}")),
        );
        h.orchestrator.add_action(action);

        let outcomes = h
            .orchestrator
            .handle_alert_state_change(&firing_event("ServiceDown", "api"))
            .await;
        assert!(!outcomes[0].is_success());

        // Two script attempts, no restart after the abort.
        let calls = h.infra.calls();
        let scripts = calls
            .iter()
            .filter(|c| matches!(c, InfraCall::Process { .. }))
            .count();
        let restarts = calls
            .iter()
            .filter(|c| matches!(c, InfraCall::Restart { .. }))
            .count();
        assert_eq!(scripts, 2);
        assert_eq!(restarts, 0);

        // Sanitized failure notification was emitted.
        let sends = h.notifier.sends();
        assert_eq!(sends.len(), 1);
        assert!(sends[0].message.title.contains("remediation failed"));

        let history = h.orchestrator.history(&ActionId::new("flush-cache"));
        assert_eq!(history.consecutive_failures, 1);
        assert_eq!(history.consecutive_successes, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_circuit_opens_after_zero_success_failures() {
        let mut config = OrchestratorConfig::default();
        config.circuit_failure_ceiling = 2;
        let h = harness(config);
        h.infra.set_fail_restarts(true);

        h.orchestrator.add_action(restart_action(Duration::ZERO));
        let event = firing_event("ServiceDown", "api");

        for _ in 0..2 {
            let outcomes = h.orchestrator.handle_alert_state_change(&event).await;
            assert!(!outcomes[0].is_success());
        }

        let third = h.orchestrator.handle_alert_state_change(&event).await;
        assert!(matches!(
            third[0],
            ActionOutcome::Skipped {
                reason: SkipReason::CircuitOpen,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_disabled_action_is_skipped() {
        let h = harness(OrchestratorConfig::default());
        let mut action = restart_action(Duration::from_secs(600));
        action.enabled = false;
        h.orchestrator.add_action(action);

        let outcomes = h
            .orchestrator
            .handle_alert_state_change(&firing_event("ServiceDown", "api"))
            .await;
        assert!(matches!(
            outcomes[0],
            ActionOutcome::Skipped {
                reason: SkipReason::Disabled,
                ..
            }
        ));
        assert!(h.infra.calls().is_empty());
    }

    #[tokio::test]
    async fn test_webhook_failure_on_server_error() {
        let h = harness(OrchestratorConfig::default());
        h.infra.set_http_status(503);

        let action = RemediationAction::new(
            ActionId::new("page-hook"),
            "page hook",
            ActionTrigger::AlertName("ServiceDown".to_string()),
        )
        .with_step(
            RemediationStep::new(StepKind::Webhook)
                .with_config("url", json!("https://hooks.internal/${alert.labels.service}"))
                .with_config("body", json!({ "alert": "${alert.name}" })),
        );
        h.orchestrator.add_action(action);

        let outcomes = h
            .orchestrator
            .handle_alert_state_change(&firing_event("ServiceDown", "api"))
            .await;
        assert!(!outcomes[0].is_success());

        let calls = h.infra.calls();
        assert_eq!(
            calls[0],
            InfraCall::Http {
                url: "https://hooks.internal/api".to_string(),
                method: "POST".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_webhook_redirect_counts_as_success() {
        let h = harness(OrchestratorConfig::default());
        h.infra.set_http_status(302);

        let action = RemediationAction::new(
            ActionId::new("page-hook"),
            "page hook",
            ActionTrigger::AlertName("ServiceDown".to_string()),
        )
        .with_step(
            RemediationStep::new(StepKind::Webhook).with_config("url", json!("https://hooks/x")),
        );
        h.orchestrator.add_action(action);

        let outcomes = h
            .orchestrator
            .handle_alert_state_change(&firing_event("ServiceDown", "api"))
            .await;
        assert!(outcomes[0].is_success());
    }

    #[tokio::test]
    async fn test_notification_step_delegates_to_notifier() {
        let h = harness(OrchestratorConfig::default());
        let action = RemediationAction::new(
            ActionId::new("announce"),
            "announce",
            ActionTrigger::AlertName("ServiceDown".to_string()),
        )
        .with_step(
            RemediationStep::new(StepKind::Notification)
                .with_config("message", json!("remediating ${alert.labels.service}"))
                .with_config("channel", json!("pagerduty")),
        );
        h.orchestrator.add_action(action);

        let outcomes = h
            .orchestrator
            .handle_alert_state_change(&firing_event("ServiceDown", "api"))
            .await;
        assert!(outcomes[0].is_success());

        let sends = h.notifier.sends();
        assert_eq!(sends.len(), 1);
        assert_eq!(sends[0].channel, ChannelKind::Pagerduty);
        assert_eq!(sends[0].message.body, "remediating api");
    }

    #[tokio::test]
    async fn test_metric_threshold_trigger() {
        let h = harness(OrchestratorConfig::default());
        h.infra.set_replicas("api", 3);

        let action = RemediationAction::new(
            ActionId::new("scale-on-cpu"),
            "scale on cpu",
            ActionTrigger::MetricThreshold {
                metric: "cpu_usage_percent".to_string(),
                op: ThresholdOp::Gt,
                value: 90.0,
            },
        )
        .with_step(
            RemediationStep::new(StepKind::Scale)
                .with_config("service", json!("${metric.service}"))
                .with_config("mode", json!("scale-up"))
                .with_config("replicas", json!("+2")),
        );
        h.orchestrator.add_action(action);

        let outcomes = h
            .orchestrator
            .handle_metric_threshold("cpu_usage_percent", 95.0, Some("api"))
            .await;
        assert_eq!(outcomes.len(), 1);
        assert!(outcomes[0].is_success());
        assert_eq!(h.infra.replicas("api"), Some(5));

        // Below the threshold nothing matches.
        let outcomes = h
            .orchestrator
            .handle_metric_threshold("cpu_usage_percent", 50.0, Some("api"))
            .await;
        assert!(outcomes.is_empty());
    }

    #[test]
    fn test_scale_request_parsing() {
        assert!(matches!(
            parse_scale_request("scale-to", "5"),
            Ok(ScaleRequest::Absolute(5))
        ));
        assert!(matches!(
            parse_scale_request("scale-to", "+3"),
            Ok(ScaleRequest::Delta(3))
        ));
        assert!(matches!(
            parse_scale_request("scale-to", "-2"),
            Ok(ScaleRequest::Delta(-2))
        ));
        assert!(matches!(
            parse_scale_request("scale-up", "2"),
            Ok(ScaleRequest::Delta(2))
        ));
        assert!(matches!(
            parse_scale_request("scale-down", "2"),
            Ok(ScaleRequest::Delta(-2))
        ));
        assert!(parse_scale_request("scale-to", "lots").is_err());
    }

    #[test]
    fn test_apply_delta_clamps_to_one() {
        assert_eq!(apply_delta(3, 2), 5);
        assert_eq!(apply_delta(2, -5), 1);
        assert_eq!(apply_delta(1, -1), 1);
    }
}
