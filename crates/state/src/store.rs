//! Key/value store trait.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use crate::error::Result;

/// String-keyed, TTL-capable JSON store.
///
/// Implementations must be safe to share across tasks. A failed write is
/// reported to the caller but never blocks in-memory state transitions;
/// callers log and continue.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Store a value under a key, optionally expiring after `ttl`.
    async fn put(&self, key: &str, value: Value, ttl: Option<Duration>) -> Result<()>;

    /// Load a value, `None` if absent or expired.
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Remove a key. Removing an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;

    /// List live keys starting with `prefix`.
    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>>;
}
