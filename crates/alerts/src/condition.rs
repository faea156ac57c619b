//! Escalation step condition evaluation.
//!
//! Conditions are a small fixed grammar, not an expression language:
//! `field op value` over the fields `severity`, `duration`, and
//! `ack_count`. Examples: `severity=critical`, `duration>10m`,
//! `ack_count=0`. Unknown fields or malformed conditions evaluate to
//! false, which skips the step.

use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::warn;

use vigil_types::Alert;

/// Evaluate a step condition against an alert.
pub fn evaluate(condition: &str, alert: &Alert, now: DateTime<Utc>) -> bool {
    let (field, op, value) = match split(condition) {
        Some(parts) => parts,
        None => {
            warn!(condition = condition, "unparseable escalation condition");
            return false;
        }
    };

    match field {
        "severity" => match op {
            "=" | "==" => alert.severity.to_string() == value,
            "!=" => alert.severity.to_string() != value,
            _ => false,
        },
        "duration" => {
            let threshold = match parse_duration(value) {
                Some(d) => d,
                None => return false,
            };
            let elapsed = alert
                .duration(now)
                .to_std()
                .unwrap_or(Duration::ZERO);
            compare(op, elapsed.as_secs_f64(), threshold.as_secs_f64())
        }
        "ack_count" => {
            let threshold: f64 = match value.parse() {
                Ok(n) => n,
                Err(_) => return false,
            };
            let acks = if alert.is_acknowledged() { 1.0 } else { 0.0 };
            compare(op, acks, threshold)
        }
        _ => {
            warn!(field = field, "unknown escalation condition field");
            false
        }
    }
}

fn split(condition: &str) -> Option<(&str, &str, &str)> {
    // Two-character operators first so `>=` is not read as `>`.
    for op in [">=", "<=", "!=", "==", "=", ">", "<"] {
        if let Some(pos) = condition.find(op) {
            let field = condition[..pos].trim();
            let value = condition[pos + op.len()..].trim();
            if !field.is_empty() && !value.is_empty() {
                return Some((field, op, value));
            }
            return None;
        }
    }
    None
}

fn compare(op: &str, left: f64, right: f64) -> bool {
    match op {
        "=" | "==" => (left - right).abs() < f64::EPSILON,
        "!=" => (left - right).abs() >= f64::EPSILON,
        ">" => left > right,
        "<" => left < right,
        ">=" => left >= right,
        "<=" => left <= right,
        _ => false,
    }
}

fn parse_duration(value: &str) -> Option<Duration> {
    let value = value.trim();
    if let Some(stripped) = value.strip_suffix('h') {
        return stripped.parse::<u64>().ok().map(|n| Duration::from_secs(n * 3600));
    }
    if let Some(stripped) = value.strip_suffix('m') {
        return stripped.parse::<u64>().ok().map(|n| Duration::from_secs(n * 60));
    }
    if let Some(stripped) = value.strip_suffix('s') {
        return stripped.parse::<u64>().ok().map(Duration::from_secs);
    }
    value.parse::<u64>().ok().map(Duration::from_secs)
}
