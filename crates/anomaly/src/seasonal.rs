//! Seasonal expectation patterns.
//!
//! Average buckets by hour-of-day (24), day-of-week (7), and week-of-year
//! (52), recomputed from the learning buffer. The blended expectation
//! weighs hourly/daily/weekly as 0.4/0.4/0.2, renormalized over the
//! buckets that actually hold data.

use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::buffer::LearningBuffer;

const HOURLY_WEIGHT: f64 = 0.4;
const DAILY_WEIGHT: f64 = 0.4;
const WEEKLY_WEIGHT: f64 = 0.2;

/// Historical averages bucketed by calendar position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeasonalPattern {
    hourly_avg: Vec<f64>,
    hourly_count: Vec<u64>,
    daily_avg: Vec<f64>,
    daily_count: Vec<u64>,
    weekly_avg: Vec<f64>,
    weekly_count: Vec<u64>,
}

impl SeasonalPattern {
    /// Create an empty pattern.
    pub fn new() -> Self {
        Self {
            hourly_avg: vec![0.0; 24],
            hourly_count: vec![0; 24],
            daily_avg: vec![0.0; 7],
            daily_count: vec![0; 7],
            weekly_avg: vec![0.0; 52],
            weekly_count: vec![0; 52],
        }
    }

    /// Recompute every bucket from the buffer contents.
    pub fn recompute(&mut self, buffer: &LearningBuffer) {
        let mut hourly_sum = vec![0.0; 24];
        let mut hourly_count = vec![0u64; 24];
        let mut daily_sum = vec![0.0; 7];
        let mut daily_count = vec![0u64; 7];
        let mut weekly_sum = vec![0.0; 52];
        let mut weekly_count = vec![0u64; 52];

        for point in buffer.iter() {
            let hour = point.timestamp.hour() as usize;
            let day = point.timestamp.weekday().num_days_from_monday() as usize;
            let week = ((point.timestamp.iso_week().week() as usize).saturating_sub(1)).min(51);

            hourly_sum[hour] += point.value;
            hourly_count[hour] += 1;
            daily_sum[day] += point.value;
            daily_count[day] += 1;
            weekly_sum[week] += point.value;
            weekly_count[week] += 1;
        }

        for hour in 0..24 {
            self.hourly_avg[hour] = if hourly_count[hour] > 0 {
                hourly_sum[hour] / hourly_count[hour] as f64
            } else {
                0.0
            };
        }
        for day in 0..7 {
            self.daily_avg[day] = if daily_count[day] > 0 {
                daily_sum[day] / daily_count[day] as f64
            } else {
                0.0
            };
        }
        for week in 0..52 {
            self.weekly_avg[week] = if weekly_count[week] > 0 {
                weekly_sum[week] / weekly_count[week] as f64
            } else {
                0.0
            };
        }
        self.hourly_count = hourly_count;
        self.daily_count = daily_count;
        self.weekly_count = weekly_count;
    }

    /// Blended expected value for a timestamp; `None` when no bucket
    /// covering it has data.
    pub fn expected(&self, at: DateTime<Utc>) -> Option<f64> {
        let hour = at.hour() as usize;
        let day = at.weekday().num_days_from_monday() as usize;
        let week = ((at.iso_week().week() as usize).saturating_sub(1)).min(51);

        let mut weighted = 0.0;
        let mut total_weight = 0.0;

        if self.hourly_count[hour] > 0 {
            weighted += HOURLY_WEIGHT * self.hourly_avg[hour];
            total_weight += HOURLY_WEIGHT;
        }
        if self.daily_count[day] > 0 {
            weighted += DAILY_WEIGHT * self.daily_avg[day];
            total_weight += DAILY_WEIGHT;
        }
        if self.weekly_count[week] > 0 {
            weighted += WEEKLY_WEIGHT * self.weekly_avg[week];
            total_weight += WEEKLY_WEIGHT;
        }

        if total_weight > 0.0 {
            Some(weighted / total_weight)
        } else {
            None
        }
    }
}

impl Default for SeasonalPattern {
    fn default() -> Self {
        Self::new()
    }
}
