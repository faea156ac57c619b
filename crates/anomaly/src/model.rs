//! Online statistical model per metric key.
//!
//! The model is updated incrementally on every sample: an exponential
//! moving average with decay `alpha = min(1/count, 0.1)`, an
//! exponentially weighted Welford-style variance using the pre- and
//! post-update means, exact min/max, and approximate percentile
//! estimates maintained by small fixed-step nudges (Robbins-Monro style,
//! not exact quantiles).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fraction of the observed value range used as the percentile nudge step.
const PERCENTILE_STEP_RATIO: f64 = 0.01;

/// Incrementally maintained statistics for one metric stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatisticalModel {
    /// Exponential moving average of observed values.
    pub mean: f64,

    /// Standard deviation derived from the online variance.
    pub std_dev: f64,

    /// Exact minimum observed.
    pub min: f64,

    /// Exact maximum observed.
    pub max: f64,

    /// Approximate 50th percentile.
    pub p50: f64,

    /// Approximate 95th percentile.
    pub p95: f64,

    /// Approximate 99th percentile.
    pub p99: f64,

    /// Samples ingested. Monotonic.
    pub count: u64,

    /// Time of the last update.
    pub last_update: DateTime<Utc>,

    variance: f64,
}

impl StatisticalModel {
    /// Create an empty model.
    pub fn new() -> Self {
        Self {
            mean: 0.0,
            std_dev: 0.0,
            min: f64::MAX,
            max: f64::MIN,
            p50: 0.0,
            p95: 0.0,
            p99: 0.0,
            count: 0,
            last_update: Utc::now(),
            variance: 0.0,
        }
    }

    /// Ingest one finite sample.
    pub fn update(&mut self, value: f64, timestamp: DateTime<Utc>) {
        self.count += 1;
        self.last_update = timestamp;

        if self.count == 1 {
            self.mean = value;
            self.variance = 0.0;
            self.std_dev = 0.0;
            self.min = value;
            self.max = value;
            self.p50 = value;
            self.p95 = value;
            self.p99 = value;
            return;
        }

        let alpha = (1.0 / self.count as f64).min(0.1);
        let old_mean = self.mean;
        self.mean += alpha * (value - old_mean);
        self.variance =
            (1.0 - alpha) * self.variance + alpha * (value - old_mean) * (value - self.mean);
        self.std_dev = self.variance.max(0.0).sqrt();

        self.min = self.min.min(value);
        self.max = self.max.max(value);

        let step = self.percentile_step(value);
        self.p50 = Self::nudge(self.p50, value, 0.50, step);
        self.p95 = Self::nudge(self.p95, value, 0.95, step);
        self.p99 = Self::nudge(self.p99, value, 0.99, step);
    }

    /// Z-score of a value against the current model. Zero while the
    /// spread is degenerate.
    pub fn z_score(&self, value: f64) -> f64 {
        if self.std_dev <= f64::EPSILON {
            return 0.0;
        }
        (value - self.mean).abs() / self.std_dev
    }

    fn percentile_step(&self, value: f64) -> f64 {
        let spread = self.max - self.min;
        if spread > f64::EPSILON {
            spread * PERCENTILE_STEP_RATIO
        } else {
            (value.abs() * PERCENTILE_STEP_RATIO).max(PERCENTILE_STEP_RATIO)
        }
    }

    // Drifts the estimate so that P(value > estimate) converges to 1-q:
    // upward steps are weighted q, downward steps 1-q.
    fn nudge(estimate: f64, value: f64, q: f64, step: f64) -> f64 {
        if value > estimate {
            estimate + step * q
        } else if value < estimate {
            estimate - step * (1.0 - q)
        } else {
            estimate
        }
    }
}

impl Default for StatisticalModel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(model: &mut StatisticalModel, values: impl IntoIterator<Item = f64>) {
        for value in values {
            model.update(value, Utc::now());
        }
    }

    #[test]
    fn test_count_and_bounds_invariant() {
        let mut model = StatisticalModel::new();
        feed(&mut model, (0..150).map(|i| 100.0 + (i % 7) as f64));

        assert_eq!(model.count, 150);
        assert!(model.min <= model.mean);
        assert!(model.mean <= model.max);
    }

    #[test]
    fn test_mean_converges_to_stable_signal() {
        let mut model = StatisticalModel::new();
        feed(&mut model, std::iter::repeat(42.0).take(200));

        assert!((model.mean - 42.0).abs() < 1e-9);
        assert!(model.std_dev < 1e-6);
    }

    #[test]
    fn test_z_score_of_outlier() {
        let mut model = StatisticalModel::new();
        // Alternating values around 100 give a non-degenerate spread.
        feed(&mut model, (0..200).map(|i| if i % 2 == 0 { 99.0 } else { 101.0 }));

        let z = model.z_score(150.0);
        assert!(z > 3.0, "outlier z-score was {}", z);
        assert!(model.z_score(model.mean) < 0.1);
    }

    #[test]
    fn test_z_score_degenerate_spread_is_zero() {
        let mut model = StatisticalModel::new();
        feed(&mut model, std::iter::repeat(5.0).take(50));
        assert_eq!(model.z_score(500.0), 0.0);
    }

    #[test]
    fn test_percentiles_are_ordered_on_spread_data() {
        let mut model = StatisticalModel::new();
        // Uniform ramp over [0, 100), repeated.
        feed(&mut model, (0..2000).map(|i| (i % 100) as f64));

        assert!(model.p50 <= model.p95 + 1.0);
        assert!(model.p95 <= model.p99 + 1.0);
        assert!(model.p95 > model.p50);
    }

    #[test]
    fn test_serde_round_trip_preserves_variance() {
        let mut model = StatisticalModel::new();
        feed(&mut model, (0..120).map(|i| (i % 13) as f64));

        let json = serde_json::to_value(&model).unwrap();
        let restored: StatisticalModel = serde_json::from_value(json).unwrap();

        assert_eq!(restored.count, model.count);
        assert_eq!(restored.std_dev, model.std_dev);
        assert_eq!(restored.z_score(50.0), model.z_score(50.0));
    }
}
