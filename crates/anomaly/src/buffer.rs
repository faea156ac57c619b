//! Bounded learning buffer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

/// One buffered observation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SamplePoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

/// Ring buffer of recent samples for one metric key.
///
/// Bounded both by capacity and by age; backpressure for the engine is
/// this bound, nothing queues behind it.
#[derive(Debug, Clone)]
pub struct LearningBuffer {
    points: VecDeque<SamplePoint>,
    capacity: usize,
    retention: Duration,
}

impl LearningBuffer {
    pub fn new(capacity: usize, retention: Duration) -> Self {
        Self {
            points: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
            retention,
        }
    }

    /// Append a sample, evicting over-capacity and over-age points.
    pub fn push(&mut self, timestamp: DateTime<Utc>, value: f64) {
        self.points.push_back(SamplePoint { timestamp, value });
        if self.points.len() > self.capacity {
            self.points.pop_front();
        }
        self.prune(timestamp);
    }

    /// Drop points older than the retention window.
    pub fn prune(&mut self, now: DateTime<Utc>) {
        let retention =
            chrono::Duration::from_std(self.retention).unwrap_or(chrono::Duration::MAX);
        while let Some(front) = self.points.front() {
            if now.signed_duration_since(front.timestamp) > retention {
                self.points.pop_front();
            } else {
                break;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SamplePoint> {
        self.points.iter()
    }
}
