//! Notification channel kinds.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Delivery channel for a notification. Rendering and delivery are the
/// notification collaborator's concern; the core only selects channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Email,
    Slack,
    Webhook,
    Pagerduty,
    Sms,
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelKind::Email => write!(f, "email"),
            ChannelKind::Slack => write!(f, "slack"),
            ChannelKind::Webhook => write!(f, "webhook"),
            ChannelKind::Pagerduty => write!(f, "pagerduty"),
            ChannelKind::Sms => write!(f, "sms"),
        }
    }
}
