use std::time::Duration;

use async_trait::async_trait;

use crate::error::CacheResult;

/// A key/value store for serialized cache entries.
///
/// Backends are shared by every request and must be safe for concurrent use.
/// Values are opaque text; an entry disappears once its TTL has elapsed.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Returns the live value stored under `key`.
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    /// Stores `value` under `key` for `ttl`. A zero TTL never expires.
    async fn set(&self, key: &str, value: String, ttl: Duration) -> CacheResult<()>;

    /// Removes `key`. Removing a missing key is not an error.
    async fn delete(&self, key: &str) -> CacheResult<()>;
}
