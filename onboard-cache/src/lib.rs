//! Read-through cache layer for onboard.
//!
//! The cache never holds authoritative state. Losing every entry only costs
//! latency: [`CacheAside::fetch`] falls back to the computation it wraps, and
//! cache failures degrade to misses instead of failing the request.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//! use onboard_cache::{CacheAside, CacheError, MemoryCache};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let cache = CacheAside::new(Arc::new(MemoryCache::new()));
//! let titles: Vec<String> = cache
//!     .fetch("books", Duration::from_secs(10), || async {
//!         Ok::<_, CacheError>(vec!["Dune".to_string()])
//!     })
//!     .await
//!     .unwrap();
//! assert_eq!(titles, ["Dune"]);
//! # }
//! ```

mod aside;
mod backend;
mod error;
mod key;
mod memory;

pub use aside::{CacheAside, DEFAULT_OP_TIMEOUT, ReadFailure};
pub use backend::CacheBackend;
pub use error::{CacheError, CacheResult};
pub use key::cache_key;
pub use memory::MemoryCache;
