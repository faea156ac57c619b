//! The Vigil control plane.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use vigil_alerts::{alert_from_anomaly, AlertManager, ManagerConfig, MaintenanceWindow};
use vigil_anomaly::{AnomalyEngine, DetectorConfig, StatisticalModel};
use vigil_infra::InfraControl;
use vigil_notify::Notifier;
use vigil_observability::MetricsRegistry;
use vigil_remediation::{OrchestratorConfig, RemediationOrchestrator};
use vigil_state::KeyValueStore;
use vigil_types::{
    ActionId, Alert, AlertRule, AutoscalingConfig, AlertId, MetricKey, RemediationAction,
    SilenceId,
};

use crate::error::Result;

/// One long-lived control-loop instance: anomaly engine, alert
/// lifecycle manager, and remediation orchestrator with their
/// collaborators injected at construction.
pub struct Vigil {
    engine: AnomalyEngine,
    manager: AlertManager,
    orchestrator: RemediationOrchestrator,
    metrics: Arc<MetricsRegistry>,
    housekeeping_interval: Duration,
}

impl Vigil {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        store: Arc<dyn KeyValueStore>,
        notifier: Arc<dyn Notifier>,
        infra: Arc<dyn InfraControl>,
        metrics: Arc<MetricsRegistry>,
        detector_config: DetectorConfig,
        manager_config: ManagerConfig,
        orchestrator_config: OrchestratorConfig,
        housekeeping_interval: Duration,
    ) -> Self {
        let core = metrics.core().clone();
        let engine = AnomalyEngine::new(detector_config, store.clone(), core.clone());
        let manager = AlertManager::new(
            manager_config,
            notifier.clone(),
            store.clone(),
            core.clone(),
        );
        let orchestrator =
            RemediationOrchestrator::new(orchestrator_config, infra, notifier, store, core);

        Self {
            engine,
            manager,
            orchestrator,
            metrics,
            housekeeping_interval,
        }
    }

    /// Ingest one metric sample. Fire-and-forget: processing failures
    /// are logged and recorded on metrics, never returned.
    pub async fn ingest_metric(
        &self,
        name: &str,
        value: f64,
        timestamp: DateTime<Utc>,
        labels: BTreeMap<String, String>,
        service: Option<String>,
    ) {
        let mut key = MetricKey::new(name);
        key.labels = labels;
        key.service = service.clone();

        if let Some(event) = self.engine.ingest(&key, value, timestamp) {
            let candidate = alert_from_anomaly(&event);
            if let Some(change) = self.manager.process_alert(candidate).await {
                self.orchestrator.handle_alert_state_change(&change).await;
            }
        }

        self.orchestrator
            .handle_metric_threshold(name, value, service.as_deref())
            .await;
    }

    /// Ingest one alert candidate from a rule-evaluation collaborator.
    /// Fire-and-forget.
    pub async fn ingest_alert(&self, candidate: Alert) {
        if let Some(change) = self.manager.process_alert(candidate).await {
            self.orchestrator.handle_alert_state_change(&change).await;
        }
    }

    // --- administrative surface ---

    /// Register or replace an alert rule.
    pub fn add_rule(&self, rule: AlertRule) {
        self.manager.add_rule(rule);
    }

    /// Remove an alert rule by id.
    pub fn remove_rule(&self, rule_id: &str) -> Result<AlertRule> {
        Ok(self.manager.remove_rule(rule_id)?)
    }

    /// Register or replace a remediation action.
    pub fn add_remediation_action(&self, action: RemediationAction) {
        self.orchestrator.add_action(action);
    }

    /// Remove a remediation action by id.
    pub fn remove_remediation_action(&self, action_id: &ActionId) -> Option<RemediationAction> {
        self.orchestrator.remove_action(action_id)
    }

    /// Install or replace an autoscaling config.
    pub fn upsert_autoscaling_config(&self, config: AutoscalingConfig) {
        self.orchestrator.upsert_autoscaling_config(config);
    }

    /// Remove a service's autoscaling config.
    pub fn remove_autoscaling_config(&self, service: &str) {
        self.orchestrator.remove_autoscaling_config(service);
    }

    /// Silence an active alert for a duration.
    pub fn silence(&self, alert_id: &AlertId, duration: Duration) -> Result<SilenceId> {
        Ok(self.manager.silence(alert_id, duration)?)
    }

    /// Acknowledge an active alert, cancelling pending escalation.
    pub fn acknowledge(&self, alert_id: &AlertId, actor: &str) -> Result<()> {
        Ok(self.manager.acknowledge(alert_id, actor)?)
    }

    /// Add a maintenance window.
    pub fn add_maintenance_window(&self, window: MaintenanceWindow) {
        self.manager.add_maintenance_window(window);
    }

    /// Remove a maintenance window by id.
    pub fn remove_maintenance_window(&self, window_id: &str) {
        self.manager.remove_maintenance_window(window_id);
    }

    /// Register a dependency suppression edge.
    pub fn add_dependency(&self, parent: impl Into<String>, children: Vec<String>) {
        self.manager.add_dependency(parent, children);
    }

    // --- introspection ---

    /// Currently active alerts.
    pub fn active_alerts(&self) -> Vec<Alert> {
        self.manager.active_alerts()
    }

    /// Statistical model for a metric key, if one exists.
    pub fn model(&self, key: &MetricKey) -> Option<StatisticalModel> {
        self.engine.model(key)
    }

    /// Prometheus text exposition of the control-loop metrics.
    pub fn metrics_text(&self) -> String {
        self.metrics.export()
    }

    // --- lifecycle ---

    /// Rehydrate all subsystems from the store. Call once at startup,
    /// before ingesting.
    pub async fn hydrate(&self) {
        self.engine.hydrate().await;
        self.manager.hydrate().await;
        self.orchestrator.hydrate().await;
        info!("control plane hydrated");
    }

    /// Flush all subsystems to the store.
    pub async fn flush(&self) {
        self.engine.flush().await;
        self.manager.snapshot().await;
        self.orchestrator.flush().await;
        debug!("control plane flushed");
    }

    /// Spawn the periodic flush loop. The handle aborts the loop when
    /// dropped via [`JoinHandle::abort`].
    pub fn start_housekeeping(self: &Arc<Self>) -> JoinHandle<()> {
        let this = self.clone();
        let interval = self.housekeeping_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                this.flush().await;
            }
        })
    }

    /// Cancel escalation timers. Call before dropping the instance.
    pub fn shutdown(&self) {
        self.manager.shutdown();
    }
}
