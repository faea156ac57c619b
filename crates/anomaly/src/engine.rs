//! Anomaly detection engine.
//!
//! One [`KeyState`] per metric key, held in a concurrent map whose entry
//! guard serializes updates per key; independent keys proceed fully
//! concurrently. Ingestion is synchronous; persistence runs in separate
//! flush/hydrate passes against the injected key/value store.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use tracing::{debug, info, warn};

use vigil_observability::CoreMetrics;
use vigil_state::{keys, KeyValueStore};
use vigil_types::{AnomalyEvent, AnomalySeverity, EventId, MetricKey};

use crate::buffer::LearningBuffer;
use crate::config::DetectorConfig;
use crate::error::AnomalyError;
use crate::model::StatisticalModel;
use crate::seasonal::SeasonalPattern;

struct KeyState {
    model: StatisticalModel,
    pattern: SeasonalPattern,
    buffer: LearningBuffer,
    history: VecDeque<AnomalyEvent>,
    samples_since_refresh: u64,
}

impl KeyState {
    fn new(config: &DetectorConfig) -> Self {
        Self {
            model: StatisticalModel::new(),
            pattern: SeasonalPattern::new(),
            buffer: LearningBuffer::new(config.buffer_capacity, config.buffer_retention),
            history: VecDeque::new(),
            samples_since_refresh: 0,
        }
    }
}

/// Persisted form of one key's model.
#[derive(Serialize, Deserialize)]
struct ModelSnapshot {
    key: MetricKey,
    model: StatisticalModel,
}

/// Persisted form of one key's seasonal pattern.
#[derive(Serialize, Deserialize)]
struct PatternSnapshot {
    key: MetricKey,
    pattern: SeasonalPattern,
}

/// Online statistical anomaly engine.
pub struct AnomalyEngine {
    config: DetectorConfig,
    states: DashMap<MetricKey, KeyState>,
    store: Arc<dyn KeyValueStore>,
    metrics: CoreMetrics,
}

impl AnomalyEngine {
    pub fn new(
        config: DetectorConfig,
        store: Arc<dyn KeyValueStore>,
        metrics: CoreMetrics,
    ) -> Self {
        Self {
            config,
            states: DashMap::new(),
            store,
            metrics,
        }
    }

    /// Ingest one sample. Returns the anomaly event to forward to the
    /// alert lifecycle manager when the sample grades as anomalous.
    ///
    /// Malformed (non-finite) samples are rejected without touching the
    /// model.
    pub fn ingest(
        &self,
        key: &MetricKey,
        value: f64,
        timestamp: DateTime<Utc>,
    ) -> Option<AnomalyEvent> {
        if !value.is_finite() {
            let err = AnomalyError::NonFiniteSample {
                key: key.clone(),
                value,
            };
            warn!(error = %err, "sample rejected");
            return None;
        }

        let mut state = self
            .states
            .entry(key.clone())
            .or_insert_with(|| KeyState::new(&self.config));

        state.buffer.push(timestamp, value);
        state.model.update(value, timestamp);

        state.samples_since_refresh += 1;
        if state.samples_since_refresh >= self.config.seasonal_refresh_interval
            && state.buffer.len() >= self.config.seasonal_min_samples
        {
            let KeyState {
                pattern, buffer, ..
            } = &mut *state;
            pattern.recompute(buffer);
            state.samples_since_refresh = 0;
            debug!(key = %key, "seasonal pattern recomputed");
        }

        let event = self.detect(key, &mut state, value, timestamp);
        if let Some(event) = &event {
            self.metrics.record_anomaly(&event.severity.to_string());
            info!(
                key = %key,
                severity = %event.severity,
                score = event.score,
                actual = event.actual_value,
                expected = event.expected_value,
                "anomaly detected"
            );
        }
        event
    }

    /// Current model for a key, if one exists.
    pub fn model(&self, key: &MetricKey) -> Option<StatisticalModel> {
        self.states.get(key).map(|s| s.model.clone())
    }

    /// Most recent anomaly events for a key, newest last.
    pub fn recent_events(&self, key: &MetricKey, limit: usize) -> Vec<AnomalyEvent> {
        self.states
            .get(key)
            .map(|s| {
                s.history
                    .iter()
                    .rev()
                    .take(limit)
                    .rev()
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Persist every model and pattern. Individual write failures are
    /// logged and skipped; in-memory state is never blocked on the store.
    pub async fn flush(&self) {
        let mut snapshots = Vec::new();
        for entry in self.states.iter() {
            snapshots.push((
                keys::model_key(entry.key()),
                ModelSnapshot {
                    key: entry.key().clone(),
                    model: entry.model.clone(),
                },
                keys::pattern_key(entry.key()),
                PatternSnapshot {
                    key: entry.key().clone(),
                    pattern: entry.pattern.clone(),
                },
            ));
        }

        for (model_key, model, pattern_key, pattern) in snapshots {
            match serde_json::to_value(&model) {
                Ok(value) => {
                    if let Err(err) = self.store.put(&model_key, value, None).await {
                        warn!(key = %model_key, error = %err, "model flush failed");
                    }
                }
                Err(err) => warn!(key = %model_key, error = %err, "model serialize failed"),
            }
            match serde_json::to_value(&pattern) {
                Ok(value) => {
                    if let Err(err) = self.store.put(&pattern_key, value, None).await {
                        warn!(key = %pattern_key, error = %err, "pattern flush failed");
                    }
                }
                Err(err) => warn!(key = %pattern_key, error = %err, "pattern serialize failed"),
            }
        }
    }

    /// Rehydrate models and patterns from the store. Learning buffers are
    /// rebuilt from live traffic; detection resumes immediately at the
    /// persisted sample counts.
    pub async fn hydrate(&self) {
        let model_keys = match self.store.keys_with_prefix(keys::MODEL_PREFIX).await {
            Ok(keys) => keys,
            Err(err) => {
                warn!(error = %err, "model hydration skipped");
                return;
            }
        };

        let mut restored = 0usize;
        for storage_key in model_keys {
            let value = match self.store.get(&storage_key).await {
                Ok(Some(value)) => value,
                Ok(None) => continue,
                Err(err) => {
                    warn!(key = %storage_key, error = %err, "model load failed");
                    continue;
                }
            };
            let snapshot: ModelSnapshot = match serde_json::from_value(value) {
                Ok(snapshot) => snapshot,
                Err(err) => {
                    warn!(key = %storage_key, error = %err, "model snapshot malformed");
                    continue;
                }
            };

            let pattern = match self.store.get(&keys::pattern_key(&snapshot.key)).await {
                Ok(Some(value)) => serde_json::from_value(value).unwrap_or_default(),
                _ => SeasonalPattern::new(),
            };

            let mut state = KeyState::new(&self.config);
            state.model = snapshot.model;
            state.pattern = pattern;
            self.states.insert(snapshot.key, state);
            restored += 1;
        }

        if restored > 0 {
            info!(models = restored, "statistical models rehydrated");
        }
    }

    fn detect(
        &self,
        key: &MetricKey,
        state: &mut KeyState,
        value: f64,
        timestamp: DateTime<Utc>,
    ) -> Option<AnomalyEvent> {
        let model = &state.model;

        let mut statistical = None;
        let mut raw_z = 0.0;
        let mut seasonal_z = 0.0;
        if model.count >= self.config.min_samples {
            raw_z = model.z_score(value);
            seasonal_z = match state.pattern.expected(timestamp) {
                Some(expected) if model.std_dev > f64::EPSILON => {
                    (value - expected).abs() / model.std_dev
                }
                _ => raw_z,
            };
            // The seasonal adjustment may only lower the grade, never
            // raise it.
            let score = raw_z.min(seasonal_z);
            statistical = if score >= self.config.high_z_threshold {
                Some((AnomalySeverity::High, score))
            } else if score >= self.config.medium_z_threshold {
                Some((AnomalySeverity::Medium, score))
            } else {
                None
            };
        }

        let business = if self.config.business_rules_enabled {
            business_override(&key.name, value)
        } else {
            None
        };

        let (severity, score, rule) = match (statistical, business) {
            (Some((stat_sev, score)), Some((biz_sev, rule))) => {
                (stat_sev.max(biz_sev), score, Some(rule))
            }
            (Some((stat_sev, score)), None) => (stat_sev, score, None),
            (None, Some((biz_sev, rule))) => (biz_sev, raw_z.min(seasonal_z), Some(rule)),
            (None, None) => return None,
        };

        let expected_value = state.pattern.expected(timestamp).unwrap_or(model.mean);
        let mut context = BTreeMap::new();
        context.insert("raw_z".to_string(), format!("{:.4}", raw_z));
        context.insert("seasonal_z".to_string(), format!("{:.4}", seasonal_z));
        context.insert("mean".to_string(), format!("{:.4}", model.mean));
        context.insert("std_dev".to_string(), format!("{:.4}", model.std_dev));
        if let Some(rule) = rule {
            context.insert("business_rule".to_string(), rule.to_string());
        }

        let event = AnomalyEvent {
            id: EventId::generate(),
            key: key.clone(),
            severity,
            confidence: (score / 4.0).clamp(0.0, 1.0),
            score,
            expected_value,
            actual_value: value,
            timestamp,
            context,
        };

        state.history.push_back(event.clone());
        let retention = chrono::Duration::from_std(self.config.history_retention)
            .unwrap_or(chrono::Duration::MAX);
        while let Some(front) = state.history.front() {
            if timestamp.signed_duration_since(front.timestamp) > retention {
                state.history.pop_front();
            } else {
                break;
            }
        }
        while state.history.len() > self.config.history_capacity {
            state.history.pop_front();
        }

        Some(event)
    }
}

/// Fixed overrides keyed by well-known metric names. These fire
/// independently of the statistical test.
fn business_override(metric: &str, value: f64) -> Option<(AnomalySeverity, &'static str)> {
    match metric {
        "response_time_ms" if value > 2000.0 => {
            Some((AnomalySeverity::High, "response_time_above_2s"))
        }
        "success_rate" if value < 0.95 => Some((AnomalySeverity::High, "success_rate_below_95")),
        "cpu_usage_percent" if value > 90.0 => Some((AnomalySeverity::Medium, "cpu_above_90")),
        "error_rate_percent" if value > 5.0 => Some((AnomalySeverity::High, "error_rate_above_5")),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_observability::MetricsRegistry;
    use vigil_state::MemoryStore;

    fn engine() -> AnomalyEngine {
        AnomalyEngine::new(
            DetectorConfig::default(),
            Arc::new(MemoryStore::new()),
            MetricsRegistry::new().core().clone(),
        )
    }

    fn feed_stable(engine: &AnomalyEngine, key: &MetricKey, n: usize) {
        for i in 0..n {
            let value = if i % 2 == 0 { 99.0 } else { 101.0 };
            let event = engine.ingest(key, value, Utc::now());
            assert!(event.is_none(), "stable sample {} flagged", i);
        }
    }

    #[test]
    fn test_outlier_after_learning_is_high_severity() {
        let engine = engine();
        let key = MetricKey::new("queue_depth").with_service("worker");
        feed_stable(&engine, &key, 150);

        let event = engine.ingest(&key, 150.0, Utc::now());
        let event = event.expect("outlier should produce an event");
        assert_eq!(event.severity, AnomalySeverity::High);
        assert!(event.score >= 3.0);
        assert_eq!(event.actual_value, 150.0);
    }

    #[test]
    fn test_no_detection_before_min_samples() {
        let engine = engine();
        let key = MetricKey::new("queue_depth");
        for i in 0..50 {
            let value = if i % 2 == 0 { 99.0 } else { 101.0 };
            engine.ingest(&key, value, Utc::now());
        }
        // Statistically extreme, but only 50 samples of evidence.
        assert!(engine.ingest(&key, 500.0, Utc::now()).is_none());
    }

    #[test]
    fn test_business_override_fires_without_statistics() {
        let engine = engine();
        let key = MetricKey::new("response_time_ms").with_service("api");

        let event = engine.ingest(&key, 2500.0, Utc::now());
        let event = event.expect("latency override should fire");
        assert_eq!(event.severity, AnomalySeverity::High);
        assert_eq!(
            event.context.get("business_rule").map(String::as_str),
            Some("response_time_above_2s")
        );
    }

    #[test]
    fn test_non_finite_sample_rejected() {
        let engine = engine();
        let key = MetricKey::new("queue_depth");
        engine.ingest(&key, 10.0, Utc::now());

        assert!(engine.ingest(&key, f64::NAN, Utc::now()).is_none());
        assert!(engine.ingest(&key, f64::INFINITY, Utc::now()).is_none());
        assert_eq!(engine.model(&key).unwrap().count, 1);
    }

    #[test]
    fn test_history_is_bounded() {
        let mut config = DetectorConfig::default();
        config.history_capacity = 5;
        config.min_samples = 1;
        let engine = AnomalyEngine::new(
            config,
            Arc::new(MemoryStore::new()),
            MetricsRegistry::new().core().clone(),
        );
        let key = MetricKey::new("response_time_ms");

        for _ in 0..20 {
            engine.ingest(&key, 3000.0, Utc::now());
        }
        assert_eq!(engine.recent_events(&key, 100).len(), 5);
    }

    #[tokio::test]
    async fn test_flush_and_hydrate_round_trip() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let key = MetricKey::new("queue_depth").with_service("worker");

        let first = AnomalyEngine::new(
            DetectorConfig::default(),
            store.clone(),
            MetricsRegistry::new().core().clone(),
        );
        for i in 0..150 {
            let value = if i % 2 == 0 { 99.0 } else { 101.0 };
            first.ingest(&key, value, Utc::now());
        }
        first.flush().await;

        let second = AnomalyEngine::new(
            DetectorConfig::default(),
            store,
            MetricsRegistry::new().core().clone(),
        );
        second.hydrate().await;

        let model = second.model(&key).expect("model restored");
        assert_eq!(model.count, 150);

        // Detection resumes immediately, no re-learning phase.
        let event = second.ingest(&key, 150.0, Utc::now());
        assert_eq!(event.expect("detects post-restart").severity, AnomalySeverity::High);
    }
}
