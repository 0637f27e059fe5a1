//! Read-through access in front of a costly computation.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::backend::CacheBackend;
use crate::error::{CacheError, CacheResult};

/// Time budget for a single backend call.
pub const DEFAULT_OP_TIMEOUT: Duration = Duration::from_secs(10);

/// What [`CacheAside::fetch`] does when the backend cannot be read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReadFailure {
    /// Log it and compute as on a miss.
    #[default]
    Degrade,
    /// Return the cache error to the caller.
    Propagate,
}

/// Cache-aside accessor over a shared [`CacheBackend`].
///
/// Concurrent misses on one key each run the computation and each write the
/// result; nothing coordinates them. Entries are never invalidated by writes
/// elsewhere, only by their TTL, so a read can be stale for up to one TTL.
#[derive(Clone)]
pub struct CacheAside {
    backend: Arc<dyn CacheBackend>,
    op_timeout: Duration,
    read_failure: ReadFailure,
}

impl CacheAside {
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self {
            backend,
            op_timeout: DEFAULT_OP_TIMEOUT,
            read_failure: ReadFailure::default(),
        }
    }

    /// Bounds every backend call by `timeout`.
    pub fn with_op_timeout(mut self, timeout: Duration) -> Self {
        self.op_timeout = timeout;
        self
    }

    pub fn with_read_failure(mut self, policy: ReadFailure) -> Self {
        self.read_failure = policy;
        self
    }

    pub fn backend(&self) -> &Arc<dyn CacheBackend> {
        &self.backend
    }

    /// Returns the value cached under `key`, or runs `compute` and caches
    /// its result for `ttl`.
    ///
    /// Empty or undecodable entries count as misses. A failed `compute`
    /// is returned as is and nothing is cached. A failed cache write is
    /// logged and the computed value is still returned.
    pub async fn fetch<T, E, F, Fut>(&self, key: &str, ttl: Duration, compute: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        E: From<CacheError>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        match self.lookup(key).await {
            Ok(Some(value)) => {
                debug!(key, "cache hit");
                return Ok(value);
            }
            Ok(None) => debug!(key, "cache miss"),
            Err(e) => match self.read_failure {
                ReadFailure::Degrade => warn!(key, "cache read failed, computing instead: {e}"),
                ReadFailure::Propagate => return Err(e.into()),
            },
        }

        let value = compute().await?;
        self.populate(key, &value, ttl).await;
        Ok(value)
    }

    async fn lookup<T: DeserializeOwned>(&self, key: &str) -> CacheResult<Option<T>> {
        let Some(raw) = self.bounded(self.backend.get(key)).await? else {
            return Ok(None);
        };
        if raw.is_empty() {
            return Ok(None);
        }
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!(key, "unreadable cache entry treated as a miss: {e}");
                Ok(None)
            }
        }
    }

    async fn populate<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        let payload = match serde_json::to_string(value) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(key, "could not serialize value for cache: {e}");
                return;
            }
        };
        if let Err(e) = self.bounded(self.backend.set(key, payload, ttl)).await {
            warn!(key, "cache write failed: {e}");
        }
    }

    async fn bounded<T>(&self, fut: impl Future<Output = CacheResult<T>>) -> CacheResult<T> {
        tokio::time::timeout(self.op_timeout, fut)
            .await
            .map_err(|_| CacheError::Timeout(self.op_timeout))?
    }
}
