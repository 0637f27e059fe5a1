use std::time::Duration;

use onboard_store::DEFAULT_TIMEOUT;

/// How long a cached list stays fresh.
pub const DEFAULT_LIST_CACHE_TTL: Duration = Duration::from_secs(10);

/// Per-service tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Budget for the store calls made by one operation.
    pub op_timeout: Duration,
    /// How long a cached list is served. Zero caches it with no expiry.
    pub list_cache_ttl: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            op_timeout: DEFAULT_TIMEOUT,
            list_cache_ttl: DEFAULT_LIST_CACHE_TTL,
        }
    }
}
