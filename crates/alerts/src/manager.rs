//! Alert lifecycle manager.
//!
//! The pipeline for one alert event runs synchronously end-to-end under
//! a per-fingerprint lock: silence check, suppression stages, state
//! transition, flap recording, escalation scheduling. Events for
//! different fingerprints proceed concurrently.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use vigil_notify::{NotificationMessage, Notifier};
use vigil_observability::CoreMetrics;
use vigil_state::{keys, KeyValueStore};
use vigil_types::{
    Alert, AlertId, AlertRule, AlertStateChange, AlertStatus, AnomalyEvent, Fingerprint,
    SilenceId, ACK_ANNOTATION,
};

use crate::config::ManagerConfig;
use crate::error::{AlertError, Result};
use crate::escalation::{EscalationContext, EscalationScheduler};
use crate::suppression::{
    DependencyMap, FlapHistory, FlapTracker, MaintenanceWindow, RateLimiter, SuppressReason,
};

/// An active silence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Silence {
    pub id: SilenceId,
    pub fingerprint: Fingerprint,
    pub until: DateTime<Utc>,
}

/// Persisted form of the active set.
#[derive(Serialize, Deserialize)]
struct ActiveSnapshot {
    alerts: Vec<Alert>,
}

/// Wrap an anomaly event into an alert candidate.
pub fn alert_from_anomaly(event: &AnomalyEvent) -> Alert {
    let mut alert = Alert::new(
        format!("{}_anomaly", event.key.name),
        event.severity.to_alert_severity(),
    )
    .with_description(format!(
        "anomalous {}: observed {:.2}, expected {:.2}",
        event.key.name, event.actual_value, event.expected_value
    ))
    .with_label("metric", event.key.name.clone());

    if let Some(service) = &event.key.service {
        alert = alert.with_service(service.clone());
    }
    for (key, value) in &event.key.labels {
        alert = alert.with_label(key.clone(), value.clone());
    }
    alert = alert
        .with_annotation("anomaly_score", format!("{:.3}", event.score))
        .with_annotation("confidence", format!("{:.3}", event.confidence));
    alert.starts_at = event.timestamp;
    alert
}

/// Fingerprint-deduplicated alert lifecycle manager.
pub struct AlertManager {
    config: ManagerConfig,
    rules: DashMap<String, AlertRule>,
    active: Arc<DashMap<Fingerprint, Alert>>,
    history: Mutex<VecDeque<Alert>>,
    silences: DashMap<Fingerprint, Silence>,
    rate_limiter: RateLimiter,
    dependencies: RwLock<DependencyMap>,
    windows: RwLock<Vec<MaintenanceWindow>>,
    flaps: FlapTracker,
    scheduler: EscalationScheduler,
    notifier: Arc<dyn Notifier>,
    store: Arc<dyn KeyValueStore>,
    metrics: CoreMetrics,
    locks: DashMap<Fingerprint, Arc<tokio::sync::Mutex<()>>>,
}

impl AlertManager {
    pub fn new(
        config: ManagerConfig,
        notifier: Arc<dyn Notifier>,
        store: Arc<dyn KeyValueStore>,
        metrics: CoreMetrics,
    ) -> Self {
        let rate_limiter = RateLimiter::new(config.rate_limit_window, config.rate_limit_max);
        let flaps = FlapTracker::new(
            config.flap_window,
            config.flap_max_transitions,
            config.flap_history_capacity,
            config.flap_history_retention,
        );
        Self {
            config,
            rules: DashMap::new(),
            active: Arc::new(DashMap::new()),
            history: Mutex::new(VecDeque::new()),
            silences: DashMap::new(),
            rate_limiter,
            dependencies: RwLock::new(DependencyMap::default()),
            windows: RwLock::new(Vec::new()),
            flaps,
            scheduler: EscalationScheduler::new(),
            notifier,
            store,
            metrics,
            locks: DashMap::new(),
        }
    }

    /// Process one alert candidate through the full pipeline. Returns
    /// the state change to forward to the remediation orchestrator, if
    /// the event caused one.
    pub async fn process_alert(&self, candidate: Alert) -> Option<AlertStateChange> {
        let fingerprint = candidate.fingerprint.clone();
        let lock = self
            .locks
            .entry(fingerprint.clone())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        let now = Utc::now();

        if self.is_silenced(&fingerprint, now) {
            self.drop_event(&candidate, SuppressReason::Silenced);
            return None;
        }

        match candidate.status {
            AlertStatus::Firing => self.process_firing(candidate, fingerprint, now).await,
            AlertStatus::Resolved => self.process_resolved(fingerprint, now),
            AlertStatus::Pending => {
                debug!(alert = %candidate.name, "pending candidate ignored");
                None
            }
        }
    }

    async fn process_firing(
        &self,
        candidate: Alert,
        fingerprint: Fingerprint,
        now: DateTime<Utc>,
    ) -> Option<AlertStateChange> {
        if self.rate_limiter.check_and_record(&fingerprint, now) {
            self.drop_event(&candidate, SuppressReason::RateLimited);
            return None;
        }

        let active_alerts: Vec<Alert> = self.active.iter().map(|e| e.clone()).collect();
        if self
            .dependencies
            .read()
            .suppresses(&candidate, active_alerts.iter())
        {
            self.drop_event(&candidate, SuppressReason::Dependency);
            return None;
        }

        if self
            .windows
            .read()
            .iter()
            .any(|w| w.matches(&candidate, now))
        {
            self.drop_event(&candidate, SuppressReason::Maintenance);
            return None;
        }

        if self.flaps.is_flapping(&fingerprint, now) {
            self.drop_event(&candidate, SuppressReason::Flapping);
            return None;
        }

        if let Some(mut existing) = self.active.get_mut(&fingerprint) {
            // Repeated firing: refresh annotations only. No transition,
            // no new escalation.
            for (key, value) in candidate.annotations {
                existing.annotations.insert(key, value);
            }
            debug!(alert = %existing.name, fingerprint = %fingerprint, "firing refresh");
            return None;
        }

        let alert = candidate;
        self.active.insert(fingerprint.clone(), alert.clone());
        self.flaps.record(&fingerprint, AlertStatus::Firing, now);
        self.metrics
            .record_alert_transition("firing", &alert.severity.to_string());
        info!(alert = %alert.name, fingerprint = %fingerprint, severity = %alert.severity, "alert firing");

        if let Some(rule) = self.rules.get(&alert.name) {
            if let Some(policy) = &rule.escalation {
                self.scheduler.schedule(&alert, policy, self.context());
            }
        }

        if alert.severity == vigil_types::AlertSeverity::Critical {
            self.notify_immediately(&alert).await;
        }

        Some(AlertStateChange {
            alert,
            previous: None,
            current: AlertStatus::Firing,
            occurred_at: now,
        })
    }

    fn process_resolved(
        &self,
        fingerprint: Fingerprint,
        now: DateTime<Utc>,
    ) -> Option<AlertStateChange> {
        let (_, mut alert) = self.active.remove(&fingerprint)?;
        alert.resolve(now);
        self.scheduler.cancel(&fingerprint);
        self.flaps.record(&fingerprint, AlertStatus::Resolved, now);
        self.metrics
            .record_alert_transition("resolved", &alert.severity.to_string());
        info!(alert = %alert.name, fingerprint = %fingerprint, "alert resolved");

        let mut history = self.history.lock();
        history.push_back(alert.clone());
        while history.len() > self.config.history_capacity {
            history.pop_front();
        }
        drop(history);

        Some(AlertStateChange {
            alert,
            previous: Some(AlertStatus::Firing),
            current: AlertStatus::Resolved,
            occurred_at: now,
        })
    }

    /// Acknowledge an active alert: cancels its remaining escalation
    /// steps without changing the firing status.
    pub fn acknowledge(&self, alert_id: &AlertId, actor: &str) -> Result<()> {
        let fingerprint = self.fingerprint_of(alert_id)?;
        if let Some(mut alert) = self.active.get_mut(&fingerprint) {
            alert
                .annotations
                .insert(ACK_ANNOTATION.to_string(), actor.to_string());
        }
        self.scheduler.cancel(&fingerprint);
        info!(alert_id = %alert_id, actor = actor, "alert acknowledged");
        Ok(())
    }

    /// Silence an active alert for a duration. Subsequent events with
    /// its fingerprint are dropped until the silence expires.
    pub fn silence(&self, alert_id: &AlertId, duration: Duration) -> Result<SilenceId> {
        let fingerprint = self.fingerprint_of(alert_id)?;
        let silence = Silence {
            id: SilenceId::generate(),
            fingerprint: fingerprint.clone(),
            until: Utc::now()
                + chrono::Duration::from_std(duration)
                    .unwrap_or_else(|_| chrono::Duration::days(3650)),
        };
        let id = silence.id.clone();
        if let Some(mut alert) = self.active.get_mut(&fingerprint) {
            alert.silenced_by = Some(id.clone());
        }
        self.silences.insert(fingerprint, silence);
        Ok(id)
    }

    /// Register or replace a rule. Escalation policies are looked up by
    /// the rule's alert name when alerts fire.
    pub fn add_rule(&self, rule: AlertRule) {
        self.rules.insert(rule.name.clone(), rule);
    }

    /// Remove a rule by id.
    pub fn remove_rule(&self, rule_id: &str) -> Result<AlertRule> {
        let name = self
            .rules
            .iter()
            .find(|r| r.id.as_str() == rule_id)
            .map(|r| r.name.clone())
            .ok_or_else(|| AlertError::RuleNotFound(rule_id.to_string()))?;
        self.rules
            .remove(&name)
            .map(|(_, rule)| rule)
            .ok_or_else(|| AlertError::RuleNotFound(rule_id.to_string()))
    }

    /// Add a maintenance window.
    pub fn add_maintenance_window(&self, window: MaintenanceWindow) {
        self.windows.write().push(window);
    }

    /// Remove a maintenance window by id.
    pub fn remove_maintenance_window(&self, window_id: &str) {
        self.windows.write().retain(|w| w.id != window_id);
    }

    /// Register a dependency suppression edge.
    pub fn add_dependency(&self, parent: impl Into<String>, children: Vec<String>) {
        self.dependencies.write().add(parent, children);
    }

    /// Snapshot of the currently active alerts.
    pub fn active_alerts(&self) -> Vec<Alert> {
        self.active.iter().map(|e| e.clone()).collect()
    }

    /// Number of active alerts.
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Resolved alerts retained in history, oldest first.
    pub fn resolved_history(&self) -> Vec<Alert> {
        self.history.lock().iter().cloned().collect()
    }

    /// Pending escalation steps for a fingerprint. Test/introspection
    /// aid.
    pub fn pending_escalations(&self, fingerprint: &Fingerprint) -> usize {
        self.scheduler.pending(fingerprint)
    }

    /// Persist the active set, flap histories, and rules. Write failures
    /// are logged; in-memory state stays authoritative.
    pub async fn snapshot(&self) {
        let snapshot = ActiveSnapshot {
            alerts: self.active_alerts(),
        };
        match serde_json::to_value(&snapshot) {
            Ok(value) => {
                if let Err(err) = self.store.put(keys::ACTIVE_ALERTS_KEY, value, None).await {
                    warn!(error = %err, "active-alert snapshot failed");
                }
            }
            Err(err) => warn!(error = %err, "active-alert snapshot serialize failed"),
        }

        for history in self.flaps.snapshot() {
            let key = keys::flap_key(&history.fingerprint);
            match serde_json::to_value(&history) {
                Ok(value) => {
                    if let Err(err) = self
                        .store
                        .put(&key, value, Some(self.config.flap_history_retention))
                        .await
                    {
                        warn!(key = %key, error = %err, "flap history flush failed");
                    }
                }
                Err(err) => warn!(key = %key, error = %err, "flap history serialize failed"),
            }
        }

        let rules: Vec<AlertRule> = self.rules.iter().map(|r| r.clone()).collect();
        for rule in rules {
            let key = keys::rule_key(&rule.id);
            match serde_json::to_value(&rule) {
                Ok(value) => {
                    if let Err(err) = self.store.put(&key, value, None).await {
                        warn!(key = %key, error = %err, "rule flush failed");
                    }
                }
                Err(err) => warn!(key = %key, error = %err, "rule serialize failed"),
            }
        }
    }

    /// Reload rules, active alerts, and flap histories from the store,
    /// rescheduling escalation for still-firing alerts from their
    /// persisted absolute start times.
    pub async fn hydrate(&self) {
        if let Ok(rule_keys) = self.store.keys_with_prefix(keys::RULE_PREFIX).await {
            for key in rule_keys {
                if let Ok(Some(value)) = self.store.get(&key).await {
                    match serde_json::from_value::<AlertRule>(value) {
                        Ok(rule) => {
                            self.rules.insert(rule.name.clone(), rule);
                        }
                        Err(err) => warn!(key = %key, error = %err, "rule snapshot malformed"),
                    }
                }
            }
        }

        if let Ok(Some(value)) = self.store.get(keys::ACTIVE_ALERTS_KEY).await {
            match serde_json::from_value::<ActiveSnapshot>(value) {
                Ok(snapshot) => {
                    let count = snapshot.alerts.len();
                    for alert in snapshot.alerts {
                        let fingerprint = alert.fingerprint.clone();
                        self.active.insert(fingerprint, alert.clone());
                        if alert.status == AlertStatus::Firing && !alert.is_acknowledged() {
                            if let Some(rule) = self.rules.get(&alert.name) {
                                if let Some(policy) = &rule.escalation {
                                    // Remaining delays derive from the
                                    // persisted starts_at, not from any
                                    // pre-restart timer.
                                    self.scheduler.schedule(&alert, policy, self.context());
                                }
                            }
                        }
                    }
                    if count > 0 {
                        info!(alerts = count, "active alerts rehydrated");
                    }
                }
                Err(err) => warn!(error = %err, "active-alert snapshot malformed"),
            }
        }

        if let Ok(flap_keys) = self.store.keys_with_prefix(keys::FLAP_PREFIX).await {
            for key in flap_keys {
                if let Ok(Some(value)) = self.store.get(&key).await {
                    match serde_json::from_value::<FlapHistory>(value) {
                        Ok(history) => self.flaps.restore(history),
                        Err(err) => warn!(key = %key, error = %err, "flap snapshot malformed"),
                    }
                }
            }
        }
    }

    /// Cancel all escalation tasks. Used on shutdown.
    pub fn shutdown(&self) {
        self.scheduler.cancel_all();
    }

    fn context(&self) -> EscalationContext {
        EscalationContext {
            active: self.active.clone(),
            notifier: self.notifier.clone(),
            metrics: self.metrics.clone(),
        }
    }

    fn is_silenced(&self, fingerprint: &Fingerprint, now: DateTime<Utc>) -> bool {
        if let Some(silence) = self.silences.get(fingerprint) {
            if silence.until > now {
                return true;
            }
        } else {
            return false;
        }
        self.silences.remove(fingerprint);
        false
    }

    fn fingerprint_of(&self, alert_id: &AlertId) -> Result<Fingerprint> {
        self.active
            .iter()
            .find(|a| &a.id == alert_id)
            .map(|a| a.fingerprint.clone())
            .ok_or_else(|| AlertError::AlertNotFound(alert_id.clone()))
    }

    fn drop_event(&self, candidate: &Alert, reason: SuppressReason) {
        self.metrics.record_suppression(reason.as_str());
        debug!(alert = %candidate.name, reason = %reason, "alert event suppressed");
    }

    async fn notify_immediately(&self, alert: &Alert) {
        let message = NotificationMessage::new(
            alert.name.clone(),
            format!("critical alert firing: {}", alert.description),
            alert.severity,
            "alerts",
        );
        for channel in &self.config.default_channels {
            match self.notifier.send(&message, *channel, 0).await {
                Ok(()) => self.metrics.record_escalation(&channel.to_string()),
                Err(err) => warn!(
                    alert = %alert.name,
                    channel = %channel,
                    error = %err,
                    "immediate notification failed"
                ),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use vigil_notify::MemoryNotifier;
    use vigil_observability::MetricsRegistry;
    use vigil_state::MemoryStore;
    use vigil_types::{
        AlertSeverity, ChannelKind, EscalationPolicy, EscalationStep, RuleId,
    };

    struct Harness {
        manager: AlertManager,
        notifier: Arc<MemoryNotifier>,
        store: Arc<MemoryStore>,
    }

    fn harness(config: ManagerConfig) -> Harness {
        let notifier = Arc::new(MemoryNotifier::new());
        let store = Arc::new(MemoryStore::new());
        let manager = AlertManager::new(
            config,
            notifier.clone(),
            store.clone(),
            MetricsRegistry::new().core().clone(),
        );
        Harness {
            manager,
            notifier,
            store,
        }
    }

    fn firing(name: &str, severity: AlertSeverity) -> Alert {
        Alert::new(name, severity).with_service("api")
    }

    fn resolved(name: &str, severity: AlertSeverity) -> Alert {
        firing(name, severity).with_status(AlertStatus::Resolved)
    }

    fn service_down_rule() -> AlertRule {
        AlertRule::new(
            RuleId::new("service-down"),
            "ServiceDown",
            "up == 0",
            AlertSeverity::Critical,
        )
        .with_escalation(EscalationPolicy::new(vec![
            EscalationStep::new(Duration::from_secs(300), vec![ChannelKind::Slack]),
            EscalationStep::new(Duration::from_secs(900), vec![ChannelKind::Pagerduty]),
        ]))
    }

    #[tokio::test]
    async fn test_new_firing_emits_state_change() {
        let h = harness(ManagerConfig::default());
        let change = h
            .manager
            .process_alert(firing("HighLatency", AlertSeverity::Warning))
            .await
            .expect("new firing produces a change");

        assert!(change.is_new_firing());
        assert_eq!(h.manager.active_count(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_firing_updates_annotations_only() {
        let h = harness(ManagerConfig::default());
        let first = firing("HighLatency", AlertSeverity::Warning);
        let fingerprint = first.fingerprint.clone();
        h.manager.process_alert(first).await;

        let second = firing("HighLatency", AlertSeverity::Warning)
            .with_annotation("observed", "250ms");
        assert!(h.manager.process_alert(second).await.is_none());

        assert_eq!(h.manager.active_count(), 1);
        let alert = h
            .manager
            .active_alerts()
            .into_iter()
            .find(|a| a.fingerprint == fingerprint)
            .unwrap();
        assert_eq!(
            alert.annotations.get("observed").map(String::as_str),
            Some("250ms")
        );
    }

    #[tokio::test]
    async fn test_resolution_removes_active_and_is_terminal() {
        let h = harness(ManagerConfig::default());
        h.manager
            .process_alert(firing("HighLatency", AlertSeverity::Warning))
            .await;

        let change = h
            .manager
            .process_alert(resolved("HighLatency", AlertSeverity::Warning))
            .await
            .expect("resolution produces a change");
        assert!(change.is_resolution());
        assert_eq!(h.manager.active_count(), 0);
        assert_eq!(h.manager.resolved_history().len(), 1);

        // A second resolution for the same fingerprint is a no-op.
        assert!(h
            .manager
            .process_alert(resolved("HighLatency", AlertSeverity::Warning))
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_critical_firing_notifies_default_channels_immediately() {
        let h = harness(ManagerConfig::default());
        h.manager
            .process_alert(firing("ServiceDown", AlertSeverity::Critical))
            .await;

        let sends = h.notifier.sends();
        assert_eq!(sends.len(), 2);
        assert!(sends.iter().all(|s| s.escalation_level == 0));
    }

    #[tokio::test]
    async fn test_flapping_firing_is_suppressed() {
        let h = harness(ManagerConfig::default());

        // firing, resolved, firing, resolved inside the window; the
        // fifth transition is damped.
        h.manager
            .process_alert(firing("Flappy", AlertSeverity::Warning))
            .await;
        h.manager
            .process_alert(resolved("Flappy", AlertSeverity::Warning))
            .await;
        h.manager
            .process_alert(firing("Flappy", AlertSeverity::Warning))
            .await;
        h.manager
            .process_alert(resolved("Flappy", AlertSeverity::Warning))
            .await;

        let change = h
            .manager
            .process_alert(firing("Flappy", AlertSeverity::Warning))
            .await;
        assert!(change.is_none());
        assert_eq!(h.manager.active_count(), 0);
    }

    #[tokio::test]
    async fn test_rate_limit_drops_excess_firings() {
        let mut config = ManagerConfig::default();
        config.rate_limit_max = 2;
        config.flap_max_transitions = 100;
        let h = harness(config);

        h.manager
            .process_alert(firing("Chatty", AlertSeverity::Warning))
            .await;
        h.manager
            .process_alert(resolved("Chatty", AlertSeverity::Warning))
            .await;
        h.manager
            .process_alert(firing("Chatty", AlertSeverity::Warning))
            .await;
        h.manager
            .process_alert(resolved("Chatty", AlertSeverity::Warning))
            .await;

        // Third firing inside the window exceeds the ceiling of 2.
        let change = h
            .manager
            .process_alert(firing("Chatty", AlertSeverity::Warning))
            .await;
        assert!(change.is_none());
        assert_eq!(h.manager.active_count(), 0);
    }

    #[tokio::test]
    async fn test_maintenance_window_suppresses() {
        let h = harness(ManagerConfig::default());
        let now = Utc::now();
        h.manager.add_maintenance_window(MaintenanceWindow {
            id: "w1".to_string(),
            starts_at: now - chrono::Duration::minutes(1),
            ends_at: now + chrono::Duration::minutes(59),
            services: vec!["api".to_string()],
            severities: vec![],
        });

        assert!(h
            .manager
            .process_alert(firing("HighLatency", AlertSeverity::Warning))
            .await
            .is_none());
        assert_eq!(h.manager.active_count(), 0);

        h.manager.remove_maintenance_window("w1");
        assert!(h
            .manager
            .process_alert(firing("HighLatency", AlertSeverity::Warning))
            .await
            .is_some());
    }

    #[tokio::test]
    async fn test_dependency_suppression() {
        let h = harness(ManagerConfig::default());
        h.manager
            .process_alert(firing("ServiceDown", AlertSeverity::Critical))
            .await;

        // HighLatency on the same service is a child of ServiceDown.
        assert!(h
            .manager
            .process_alert(firing("HighLatency", AlertSeverity::Warning))
            .await
            .is_none());
        assert_eq!(h.manager.active_count(), 1);
    }

    #[tokio::test]
    async fn test_silence_drops_events() {
        let h = harness(ManagerConfig::default());
        let change = h
            .manager
            .process_alert(firing("HighLatency", AlertSeverity::Warning))
            .await
            .unwrap();

        h.manager
            .silence(&change.alert.id, Duration::from_secs(3600))
            .unwrap();

        // Even the resolution is dropped while silenced.
        assert!(h
            .manager
            .process_alert(resolved("HighLatency", AlertSeverity::Warning))
            .await
            .is_none());
        assert_eq!(h.manager.active_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_acknowledge_cancels_escalation() {
        let h = harness(ManagerConfig::default());
        h.manager.add_rule(service_down_rule());

        let change = h
            .manager
            .process_alert(firing("ServiceDown", AlertSeverity::Critical))
            .await
            .unwrap();
        assert_eq!(h.manager.pending_escalations(&change.alert.fingerprint), 2);

        // Acknowledged before the first step's 5 minute delay.
        h.manager.acknowledge(&change.alert.id, "oncall").unwrap();

        tokio::time::sleep(Duration::from_secs(1200)).await;
        let escalations: Vec<_> = h
            .notifier
            .sends()
            .into_iter()
            .filter(|s| s.escalation_level > 0)
            .collect();
        assert!(escalations.is_empty());
        // Still firing: acknowledgement does not resolve.
        assert_eq!(h.manager.active_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolution_cancels_escalation() {
        let h = harness(ManagerConfig::default());
        h.manager.add_rule(service_down_rule());

        h.manager
            .process_alert(firing("ServiceDown", AlertSeverity::Critical))
            .await;
        h.manager
            .process_alert(resolved("ServiceDown", AlertSeverity::Critical))
            .await;

        tokio::time::sleep(Duration::from_secs(1200)).await;
        let escalations: Vec<_> = h
            .notifier
            .sends()
            .into_iter()
            .filter(|s| s.escalation_level > 0)
            .collect();
        assert!(escalations.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_escalation_fires_when_unacknowledged() {
        let h = harness(ManagerConfig::default());
        h.manager.add_rule(service_down_rule());

        h.manager
            .process_alert(firing("ServiceDown", AlertSeverity::Critical))
            .await;

        tokio::time::sleep(Duration::from_secs(1200)).await;
        let escalations: Vec<_> = h
            .notifier
            .sends()
            .into_iter()
            .filter(|s| s.escalation_level > 0)
            .collect();
        assert_eq!(escalations.len(), 2);
        assert_eq!(escalations[0].channel, ChannelKind::Slack);
        assert_eq!(escalations[1].channel, ChannelKind::Pagerduty);
    }

    #[tokio::test]
    async fn test_snapshot_and_hydrate_round_trip() {
        let h = harness(ManagerConfig::default());
        h.manager.add_rule(service_down_rule());
        h.manager
            .process_alert(firing("ServiceDown", AlertSeverity::Critical))
            .await;
        h.manager.snapshot().await;
        h.manager.shutdown();

        let restored = AlertManager::new(
            ManagerConfig::default(),
            Arc::new(MemoryNotifier::new()),
            h.store.clone(),
            MetricsRegistry::new().core().clone(),
        );
        restored.hydrate().await;

        assert_eq!(restored.active_count(), 1);
        let alert = restored.active_alerts().pop().unwrap();
        // Escalation rescheduled from the persisted start time.
        assert_eq!(restored.pending_escalations(&alert.fingerprint), 2);
        restored.shutdown();
    }
}
