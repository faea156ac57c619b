//! Per-action execution history ledger.
//!
//! The ledger is the in-memory authority for cooldown and circuit
//! decisions; it is flushed to the store and rehydrated at startup so
//! cooldowns survive restarts.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::warn;

use vigil_state::{keys, KeyValueStore};
use vigil_types::{ActionId, ExecutionHistory};

/// Fingerprint of execution state per action id.
pub struct ExecutionLedger {
    entries: DashMap<ActionId, ExecutionHistory>,
    store: Arc<dyn KeyValueStore>,
}

impl ExecutionLedger {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            entries: DashMap::new(),
            store,
        }
    }

    /// Current history for an action (default when never executed).
    pub fn get(&self, action: &ActionId) -> ExecutionHistory {
        self.entries
            .get(action)
            .map(|e| e.clone())
            .unwrap_or_default()
    }

    /// Record a successful execution.
    pub fn record_success(&self, action: &ActionId, at: DateTime<Utc>) {
        self.entries
            .entry(action.clone())
            .or_default()
            .record_success(at);
    }

    /// Record a failed execution.
    pub fn record_failure(&self, action: &ActionId, at: DateTime<Utc>) {
        self.entries
            .entry(action.clone())
            .or_default()
            .record_failure(at);
    }

    /// Persist all histories. Failures are logged and skipped.
    pub async fn flush(&self) {
        let snapshot: Vec<(ActionId, ExecutionHistory)> = self
            .entries
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();

        for (action, history) in snapshot {
            let key = keys::execution_key(&action);
            match serde_json::to_value(&history) {
                Ok(value) => {
                    if let Err(err) = self.store.put(&key, value, None).await {
                        warn!(key = %key, error = %err, "execution history flush failed");
                    }
                }
                Err(err) => warn!(key = %key, error = %err, "execution history serialize failed"),
            }
        }
    }

    /// Reload histories for the given action ids.
    pub async fn hydrate(&self, actions: &[ActionId]) {
        for action in actions {
            let key = keys::execution_key(action);
            match self.store.get(&key).await {
                Ok(Some(value)) => match serde_json::from_value::<ExecutionHistory>(value) {
                    Ok(history) => {
                        self.entries.insert(action.clone(), history);
                    }
                    Err(err) => warn!(key = %key, error = %err, "execution snapshot malformed"),
                },
                Ok(None) => {}
                Err(err) => warn!(key = %key, error = %err, "execution history load failed"),
            }
        }
    }
}
