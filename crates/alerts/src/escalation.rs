//! Escalation step scheduling.
//!
//! Every escalation step of a firing alert becomes an independent
//! delayed task. Deadlines are absolute (`starts_at + delay`), so
//! rescheduling after a restart recomputes the remaining wait from
//! persisted timestamps instead of relying on process-local timers.
//! Cancellation aborts all of a fingerprint's tasks and is idempotent:
//! cancelling twice, or after the timers already fired, is a no-op.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use vigil_notify::{NotificationMessage, Notifier};
use vigil_observability::CoreMetrics;
use vigil_types::{Alert, AlertStatus, EscalationPolicy, Fingerprint};

use crate::condition;

/// Shared lookups an escalation task needs at fire time.
pub struct EscalationContext {
    /// Active alert set; the task re-reads the alert when it wakes.
    pub active: Arc<DashMap<Fingerprint, Alert>>,

    /// Notification collaborator.
    pub notifier: Arc<dyn Notifier>,

    /// Metrics collaborator.
    pub metrics: CoreMetrics,
}

impl Clone for EscalationContext {
    fn clone(&self) -> Self {
        Self {
            active: self.active.clone(),
            notifier: self.notifier.clone(),
            metrics: self.metrics.clone(),
        }
    }
}

struct StepHandle {
    handle: JoinHandle<()>,
    #[allow(dead_code)]
    due_at: DateTime<Utc>,
}

/// Fingerprint-keyed table of scheduled escalation tasks.
pub struct EscalationScheduler {
    tasks: DashMap<Fingerprint, Vec<StepHandle>>,
}

impl EscalationScheduler {
    pub fn new() -> Self {
        Self {
            tasks: DashMap::new(),
        }
    }

    /// Schedule every step of a policy for an alert. Deadlines are
    /// relative to the alert's `starts_at`, so a step whose deadline has
    /// already passed (rescheduling after restart) fires immediately.
    pub fn schedule(&self, alert: &Alert, policy: &EscalationPolicy, ctx: EscalationContext) {
        let fingerprint = alert.fingerprint.clone();
        let mut handles = Vec::with_capacity(policy.steps.len());

        for (index, step) in policy.steps.iter().enumerate() {
            let delay = chrono::Duration::from_std(step.delay)
                .unwrap_or_else(|_| chrono::Duration::days(3650));
            let due_at = alert.starts_at + delay;
            let fp = fingerprint.clone();
            let channels = step.channels.clone();
            let step_condition = step.condition.clone();
            let ctx = ctx.clone();
            let level = (index + 1) as u32;

            let handle = tokio::spawn(async move {
                let wait = (due_at - Utc::now()).to_std().unwrap_or(Duration::ZERO);
                tokio::time::sleep(wait).await;

                let fire_time = Utc::now();
                let alert = match ctx.active.get(&fp) {
                    Some(entry) if entry.status == AlertStatus::Firing => entry.clone(),
                    _ => return,
                };
                if alert.is_acknowledged() {
                    return;
                }
                if let Some(cond) = &step_condition {
                    if !condition::evaluate(cond, &alert, fire_time) {
                        debug!(
                            alert = %alert.name,
                            condition = %cond,
                            level = level,
                            "escalation step condition not met, skipping"
                        );
                        return;
                    }
                }

                let message = NotificationMessage::new(
                    alert.name.clone(),
                    format!(
                        "escalation level {} for {}: {}",
                        level, alert.name, alert.description
                    ),
                    alert.severity,
                    "alerts",
                );
                for channel in channels {
                    match ctx.notifier.send(&message, channel, level).await {
                        Ok(()) => ctx.metrics.record_escalation(&channel.to_string()),
                        Err(err) => warn!(
                            alert = %alert.name,
                            channel = %channel,
                            error = %err,
                            "escalation notification failed"
                        ),
                    }
                }
            });

            handles.push(StepHandle { handle, due_at });
        }

        if !handles.is_empty() {
            self.tasks.entry(fingerprint).or_default().extend(handles);
        }
    }

    /// Abort all pending steps for a fingerprint. Safe to call multiple
    /// times and after the timers already fired.
    pub fn cancel(&self, fingerprint: &Fingerprint) {
        if let Some((_, handles)) = self.tasks.remove(fingerprint) {
            for step in handles {
                step.handle.abort();
            }
        }
    }

    /// Number of scheduled (possibly already completed) steps.
    pub fn pending(&self, fingerprint: &Fingerprint) -> usize {
        self.tasks
            .get(fingerprint)
            .map(|h| h.iter().filter(|s| !s.handle.is_finished()).count())
            .unwrap_or(0)
    }

    /// Abort everything. Used on shutdown.
    pub fn cancel_all(&self) {
        let fingerprints: Vec<Fingerprint> =
            self.tasks.iter().map(|e| e.key().clone()).collect();
        for fp in fingerprints {
            self.cancel(&fp);
        }
    }
}

impl Default for EscalationScheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_notify::MemoryNotifier;
    use vigil_observability::MetricsRegistry;
    use vigil_types::{AlertSeverity, ChannelKind, EscalationStep};

    fn context(
        active: Arc<DashMap<Fingerprint, Alert>>,
        notifier: Arc<MemoryNotifier>,
    ) -> EscalationContext {
        EscalationContext {
            active,
            notifier,
            metrics: MetricsRegistry::new().core().clone(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_step_fires_for_active_alert() {
        let active: Arc<DashMap<Fingerprint, Alert>> = Arc::new(DashMap::new());
        let notifier = Arc::new(MemoryNotifier::new());
        let scheduler = EscalationScheduler::new();

        let alert = Alert::new("ServiceDown", AlertSeverity::Critical).with_service("api");
        active.insert(alert.fingerprint.clone(), alert.clone());

        let policy = EscalationPolicy::new(vec![EscalationStep::new(
            Duration::from_secs(300),
            vec![ChannelKind::Slack],
        )]);
        scheduler.schedule(&alert, &policy, context(active, notifier.clone()));

        tokio::time::sleep(Duration::from_secs(400)).await;
        let sends = notifier.sends();
        assert_eq!(sends.len(), 1);
        assert_eq!(sends[0].escalation_level, 1);
        assert_eq!(sends[0].channel, ChannelKind::Slack);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_is_idempotent_and_stops_steps() {
        let active: Arc<DashMap<Fingerprint, Alert>> = Arc::new(DashMap::new());
        let notifier = Arc::new(MemoryNotifier::new());
        let scheduler = EscalationScheduler::new();

        let alert = Alert::new("ServiceDown", AlertSeverity::Critical);
        active.insert(alert.fingerprint.clone(), alert.clone());

        let policy = EscalationPolicy::new(vec![
            EscalationStep::new(Duration::from_secs(300), vec![ChannelKind::Slack]),
            EscalationStep::new(Duration::from_secs(900), vec![ChannelKind::Pagerduty]),
        ]);
        scheduler.schedule(&alert, &policy, context(active, notifier.clone()));

        scheduler.cancel(&alert.fingerprint);
        scheduler.cancel(&alert.fingerprint);

        tokio::time::sleep(Duration::from_secs(1200)).await;
        assert_eq!(notifier.send_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_step_skipped_when_alert_resolved() {
        let active: Arc<DashMap<Fingerprint, Alert>> = Arc::new(DashMap::new());
        let notifier = Arc::new(MemoryNotifier::new());
        let scheduler = EscalationScheduler::new();

        let alert = Alert::new("HighLatency", AlertSeverity::Warning);
        active.insert(alert.fingerprint.clone(), alert.clone());

        let policy = EscalationPolicy::new(vec![EscalationStep::new(
            Duration::from_secs(60),
            vec![ChannelKind::Email],
        )]);
        scheduler.schedule(&alert, &policy, context(active.clone(), notifier.clone()));

        // Alert resolves before the step fires; the task sees it gone.
        active.remove(&alert.fingerprint);
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(notifier.send_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_step_condition_gates_firing() {
        let active: Arc<DashMap<Fingerprint, Alert>> = Arc::new(DashMap::new());
        let notifier = Arc::new(MemoryNotifier::new());
        let scheduler = EscalationScheduler::new();

        let alert = Alert::new("HighLatency", AlertSeverity::Warning);
        active.insert(alert.fingerprint.clone(), alert.clone());

        let policy = EscalationPolicy::new(vec![EscalationStep::new(
            Duration::from_secs(60),
            vec![ChannelKind::Pagerduty],
        )
        .with_condition("severity=critical")]);
        scheduler.schedule(&alert, &policy, context(active, notifier.clone()));

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(notifier.send_count(), 0);
    }
}
