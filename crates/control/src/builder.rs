//! Builder for the Vigil control plane
//!
//! The builder pattern allows flexible configuration of the control
//! plane with all its required collaborators injected explicitly.

use std::sync::Arc;
use std::time::Duration;

use vigil_alerts::ManagerConfig;
use vigil_anomaly::DetectorConfig;
use vigil_infra::InfraControl;
use vigil_notify::Notifier;
use vigil_observability::MetricsRegistry;
use vigil_remediation::OrchestratorConfig;
use vigil_state::KeyValueStore;

use crate::core::Vigil;
use crate::error::{ControlError, Result};

/// Builder for constructing a [`Vigil`] instance with all dependencies
pub struct VigilBuilder {
    store: Option<Arc<dyn KeyValueStore>>,
    notifier: Option<Arc<dyn Notifier>>,
    infra: Option<Arc<dyn InfraControl>>,
    metrics: Option<Arc<MetricsRegistry>>,
    detector_config: Option<DetectorConfig>,
    manager_config: Option<ManagerConfig>,
    orchestrator_config: Option<OrchestratorConfig>,
    housekeeping_interval: Option<Duration>,
}

impl VigilBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self {
            store: None,
            notifier: None,
            infra: None,
            metrics: None,
            detector_config: None,
            manager_config: None,
            orchestrator_config: None,
            housekeeping_interval: None,
        }
    }

    /// Set the persistence store
    pub fn with_store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the notification collaborator
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Set the infrastructure-control collaborator
    pub fn with_infra(mut self, infra: Arc<dyn InfraControl>) -> Self {
        self.infra = Some(infra);
        self
    }

    /// Set the metrics registry
    pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Set the anomaly detector configuration
    pub fn with_detector_config(mut self, config: DetectorConfig) -> Self {
        self.detector_config = Some(config);
        self
    }

    /// Set the alert manager configuration
    pub fn with_manager_config(mut self, config: ManagerConfig) -> Self {
        self.manager_config = Some(config);
        self
    }

    /// Set the remediation orchestrator configuration
    pub fn with_orchestrator_config(mut self, config: OrchestratorConfig) -> Self {
        self.orchestrator_config = Some(config);
        self
    }

    /// Set the housekeeping flush cadence
    pub fn with_housekeeping_interval(mut self, interval: Duration) -> Self {
        self.housekeeping_interval = Some(interval);
        self
    }

    /// Build the control plane with all components
    pub fn build(self) -> Result<Vigil> {
        let store = self
            .store
            .ok_or_else(|| ControlError::InvalidConfiguration("store required".into()))?;
        let notifier = self
            .notifier
            .ok_or_else(|| ControlError::InvalidConfiguration("notifier required".into()))?;
        let infra = self
            .infra
            .ok_or_else(|| ControlError::InvalidConfiguration("infra required".into()))?;

        let metrics = self.metrics.unwrap_or_else(|| Arc::new(MetricsRegistry::new()));
        let detector_config = self.detector_config.unwrap_or_default();
        let manager_config = self.manager_config.unwrap_or_default();
        let orchestrator_config = self.orchestrator_config.unwrap_or_default();
        let housekeeping_interval = self
            .housekeeping_interval
            .unwrap_or(manager_config.snapshot_interval);

        Ok(Vigil::new(
            store,
            notifier,
            infra,
            metrics,
            detector_config,
            manager_config,
            orchestrator_config,
            housekeeping_interval,
        ))
    }
}

impl Default for VigilBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_infra::MemoryInfra;
    use vigil_notify::MemoryNotifier;
    use vigil_state::MemoryStore;

    #[test]
    fn test_builder_missing_fields() {
        let result = VigilBuilder::new().build();
        assert!(result.is_err());
    }

    #[test]
    fn test_builder_complete() {
        let result = VigilBuilder::new()
            .with_store(Arc::new(MemoryStore::new()))
            .with_notifier(Arc::new(MemoryNotifier::new()))
            .with_infra(Arc::new(MemoryInfra::new()))
            .build();

        assert!(result.is_ok());
    }
}
