//! Autoscaling controller.
//!
//! A narrower policy than general remediation actions: each incoming
//! metric sample for a service with an enabled config is compared
//! against its target. Above target scales up, below half the target
//! scales down; the proportional desired count is clamped to the replica
//! bounds and a change that lands on the current count is a no-op. Each
//! (service, direction) pair has its own cooldown, persisted so it
//! survives restarts.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

use vigil_infra::InfraControl;
use vigil_observability::CoreMetrics;
use vigil_state::{keys, KeyValueStore};
use vigil_types::{AutoscalingConfig, ScaleDirection};

/// A replica change the autoscaler carried out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScaleDecision {
    pub service: String,
    pub direction: ScaleDirection,
    pub from_replicas: u32,
    pub to_replicas: u32,
}

/// Persisted cooldown marker.
#[derive(Serialize, Deserialize)]
struct CooldownSnapshot {
    service: String,
    direction: ScaleDirection,
    at: DateTime<Utc>,
}

/// Per-service autoscaling controller.
pub struct Autoscaler {
    configs: DashMap<String, AutoscalingConfig>,
    cooldowns: DashMap<(String, ScaleDirection), DateTime<Utc>>,
    infra: Arc<dyn InfraControl>,
    store: Arc<dyn KeyValueStore>,
    metrics: CoreMetrics,
}

impl Autoscaler {
    pub fn new(
        infra: Arc<dyn InfraControl>,
        store: Arc<dyn KeyValueStore>,
        metrics: CoreMetrics,
    ) -> Self {
        Self {
            configs: DashMap::new(),
            cooldowns: DashMap::new(),
            infra,
            store,
            metrics,
        }
    }

    /// Install or replace a service's config.
    pub fn upsert_config(&self, config: AutoscalingConfig) {
        self.configs.insert(config.service.clone(), config);
    }

    /// Remove a service's config.
    pub fn remove_config(&self, service: &str) {
        self.configs.remove(service);
    }

    /// Configured services.
    pub fn services(&self) -> Vec<String> {
        self.configs.iter().map(|e| e.key().clone()).collect()
    }

    /// Evaluate one metric sample for a service. Returns the decision
    /// when a replica change was issued.
    pub async fn evaluate(&self, service: &str, metric: &str, value: f64) -> Option<ScaleDecision> {
        let config = self.configs.get(service)?.clone();
        if !config.enabled {
            return None;
        }
        let target = config.target_for(metric)?;
        if target <= 0.0 {
            return None;
        }

        let direction = if value > target {
            ScaleDirection::Up
        } else if value < target / 2.0 {
            ScaleDirection::Down
        } else {
            return None;
        };

        let now = Utc::now();
        let cooldown = config.cooldown_for(direction);
        if let Some(last) = self
            .cooldowns
            .get(&(service.to_string(), direction))
            .map(|e| *e)
        {
            let elapsed = now.signed_duration_since(last);
            if elapsed.to_std().map(|d| d < cooldown).unwrap_or(true) {
                debug!(service = service, direction = %direction, "autoscale in cooldown");
                return None;
            }
        }

        // A failed replica probe is a safe no-op, never a crash.
        let current = match self.infra.current_replicas(service).await {
            Ok(current) => current,
            Err(err) => {
                warn!(service = service, error = %err, "replica probe failed, skipping autoscale");
                return None;
            }
        };

        let desired = ((current as f64) * value / target).ceil().max(1.0) as u32;
        let clamped = config.clamp_replicas(desired);
        if clamped == current {
            return None;
        }

        if let Err(err) = self.infra.scale_deployment(service, clamped).await {
            warn!(service = service, replicas = clamped, error = %err, "autoscale failed");
            return None;
        }

        self.cooldowns
            .insert((service.to_string(), direction), now);
        self.persist_cooldown(service, direction, now).await;
        self.metrics
            .record_autoscaling(service, &direction.to_string());
        info!(
            service = service,
            direction = %direction,
            from = current,
            to = clamped,
            metric = metric,
            value = value,
            "autoscaled"
        );

        Some(ScaleDecision {
            service: service.to_string(),
            direction,
            from_replicas: current,
            to_replicas: clamped,
        })
    }

    /// Persist configs. Cooldowns are persisted at scale time.
    pub async fn flush(&self) {
        let configs: Vec<AutoscalingConfig> =
            self.configs.iter().map(|e| e.value().clone()).collect();
        for config in configs {
            let key = keys::autoscale_config_key(&config.service);
            match serde_json::to_value(&config) {
                Ok(value) => {
                    if let Err(err) = self.store.put(&key, value, None).await {
                        warn!(key = %key, error = %err, "autoscale config flush failed");
                    }
                }
                Err(err) => warn!(key = %key, error = %err, "autoscale config serialize failed"),
            }
        }
    }

    /// Reload configs and cooldown markers.
    pub async fn hydrate(&self) {
        if let Ok(config_keys) = self
            .store
            .keys_with_prefix(keys::AUTOSCALE_CONFIG_PREFIX)
            .await
        {
            for key in config_keys {
                if let Ok(Some(value)) = self.store.get(&key).await {
                    match serde_json::from_value::<AutoscalingConfig>(value) {
                        Ok(config) => self.upsert_config(config),
                        Err(err) => warn!(key = %key, error = %err, "autoscale config malformed"),
                    }
                }
            }
        }

        if let Ok(cooldown_keys) = self
            .store
            .keys_with_prefix(keys::AUTOSCALE_COOLDOWN_PREFIX)
            .await
        {
            for key in cooldown_keys {
                if let Ok(Some(value)) = self.store.get(&key).await {
                    match serde_json::from_value::<CooldownSnapshot>(value) {
                        Ok(snapshot) => {
                            self.cooldowns
                                .insert((snapshot.service, snapshot.direction), snapshot.at);
                        }
                        Err(err) => warn!(key = %key, error = %err, "cooldown snapshot malformed"),
                    }
                }
            }
        }
    }

    async fn persist_cooldown(&self, service: &str, direction: ScaleDirection, at: DateTime<Utc>) {
        let key = keys::autoscale_cooldown_key(service, direction);
        let snapshot = CooldownSnapshot {
            service: service.to_string(),
            direction,
            at,
        };
        match serde_json::to_value(&snapshot) {
            Ok(value) => {
                if let Err(err) = self.store.put(&key, value, None).await {
                    warn!(key = %key, error = %err, "cooldown flush failed");
                }
            }
            Err(err) => warn!(key = %key, error = %err, "cooldown serialize failed"),
        }
    }
}
