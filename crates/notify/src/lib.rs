//! Notification collaborator seam.
//!
//! The core decides *when* and *what* to notify; rendering and delivery
//! belong to the implementation behind [`Notifier`]. Two implementations
//! ship here: [`LogNotifier`] (structured log lines, the development
//! default) and [`MemoryNotifier`] (records sends, for tests).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use vigil_types::{AlertSeverity, ChannelKind};

/// Errors surfaced by a notification backend.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// Channel rejected the message.
    #[error("delivery failed on {channel}: {reason}")]
    DeliveryFailed {
        channel: ChannelKind,
        reason: String,
    },

    /// Channel is not configured in this deployment.
    #[error("channel not configured: {0}")]
    ChannelUnavailable(ChannelKind),
}

/// Result type for notification operations.
pub type Result<T> = std::result::Result<T, NotifyError>;

/// A notification request handed to the collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationMessage {
    /// Short title, e.g. the alert name.
    pub title: String,

    /// Message body.
    pub body: String,

    /// Severity, used by channels for routing/formatting.
    pub severity: AlertSeverity,

    /// Originating subsystem, e.g. `alerts` or `remediation`.
    pub source: String,

    /// Time the message was produced.
    pub created_at: DateTime<Utc>,
}

impl NotificationMessage {
    pub fn new(
        title: impl Into<String>,
        body: impl Into<String>,
        severity: AlertSeverity,
        source: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            severity,
            source: source.into(),
            created_at: Utc::now(),
        }
    }
}

/// Outbound notification delivery.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver a message on a channel. `escalation_level` is 0 for the
    /// initial notification and increments per escalation step.
    async fn send(
        &self,
        message: &NotificationMessage,
        channel: ChannelKind,
        escalation_level: u32,
    ) -> Result<()>;
}

/// Notifier that writes structured log lines instead of delivering.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(
        &self,
        message: &NotificationMessage,
        channel: ChannelKind,
        escalation_level: u32,
    ) -> Result<()> {
        info!(
            channel = %channel,
            severity = %message.severity,
            source = %message.source,
            escalation_level = escalation_level,
            title = %message.title,
            "notification"
        );
        Ok(())
    }
}

/// A send recorded by [`MemoryNotifier`].
#[derive(Debug, Clone)]
pub struct RecordedSend {
    pub message: NotificationMessage,
    pub channel: ChannelKind,
    pub escalation_level: u32,
}

/// Notifier that records every send in memory. Test collaborator.
#[derive(Default)]
pub struct MemoryNotifier {
    sends: Mutex<Vec<RecordedSend>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded sends, in order.
    pub fn sends(&self) -> Vec<RecordedSend> {
        self.sends.lock().clone()
    }

    /// Number of recorded sends.
    pub fn send_count(&self) -> usize {
        self.sends.lock().len()
    }
}

#[async_trait]
impl Notifier for MemoryNotifier {
    async fn send(
        &self,
        message: &NotificationMessage,
        channel: ChannelKind,
        escalation_level: u32,
    ) -> Result<()> {
        self.sends.lock().push(RecordedSend {
            message: message.clone(),
            channel,
            escalation_level,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_notifier_records() {
        let notifier = MemoryNotifier::new();
        let message = NotificationMessage::new(
            "HighErrorRate",
            "error rate above 5%",
            AlertSeverity::Critical,
            "alerts",
        );

        notifier
            .send(&message, ChannelKind::Slack, 0)
            .await
            .unwrap();
        notifier
            .send(&message, ChannelKind::Pagerduty, 1)
            .await
            .unwrap();

        let sends = notifier.sends();
        assert_eq!(sends.len(), 2);
        assert_eq!(sends[0].channel, ChannelKind::Slack);
        assert_eq!(sends[1].escalation_level, 1);
    }
}
