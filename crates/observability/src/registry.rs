//! Central metrics registry for Vigil

use prometheus::{Encoder, Registry, TextEncoder};
use std::sync::Arc;

use crate::collectors::CoreMetrics;

/// Central metrics registry for Vigil
pub struct MetricsRegistry {
    registry: Arc<Registry>,
    core_metrics: CoreMetrics,
}

impl MetricsRegistry {
    /// Create a new metrics registry with default prefix "vigil"
    pub fn new() -> Self {
        Self::with_prefix("vigil")
    }

    /// Create a new metrics registry with custom prefix
    pub fn with_prefix(prefix: &str) -> Self {
        let registry = Arc::new(
            Registry::new_custom(Some(prefix.to_string()), None)
                .expect("Failed to create metrics registry"),
        );
        let core_metrics = CoreMetrics::new(&registry);

        Self {
            registry,
            core_metrics,
        }
    }

    /// Get the core control-loop metrics
    pub fn core(&self) -> &CoreMetrics {
        &self.core_metrics
    }

    /// Export metrics in Prometheus text format
    pub fn export(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .expect("Failed to encode metrics");
        String::from_utf8(buffer).expect("Metrics output is not valid UTF-8")
    }

    /// Get the underlying registry for custom metrics
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}
