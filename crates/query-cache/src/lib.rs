//! Query Result Cache for Query Engine
//!
//! This crate provides a bounded cache for storing query results in front of
//! a query executor, keyed by query text and bound parameters.
//!
//! # Features
//!
//! - **Pluggable Eviction**: LRU, LFU, FIFO or TTL-first victim selection
//! - **TTL Support**: Entries older than the TTL are dropped lazily on access
//! - **Size Limits**: Entry count and estimated byte size bounds
//! - **Statistics**: Track hits, misses, evictions and expirations
//! - **Invalidation**: Substring or regex invalidation over cache keys
//! - **Snapshots**: Export to and import from a JSON document
//!
//! # Example
//!
//! ```ignore
//! use query_cache::{CacheConfig, EvictionPolicy, QueryCacheManager};
//!
//! let cache = QueryCacheManager::new(
//!     CacheConfig::default().with_eviction_strategy(EvictionPolicy::Lfu),
//! );
//!
//! let rows = cache
//!     .get_or_fetch(sql, &params, || runner.run(sql, &params))
//!     .await?;
//! ```

pub mod config;
pub mod error;
pub mod eviction;
pub mod invalidation;
pub mod key;
pub mod manager;
pub mod snapshot;
pub mod stats;
pub mod storage;

pub use config::{CacheConfig, EvictionPolicy};
pub use error::CacheError;
pub use eviction::EvictionStrategy;
pub use invalidation::InvalidationPattern;
pub use key::KeyGenerator;
pub use manager::{CacheValue, Lookup, QueryCacheManager, WarmUpQuery, WarmUpSummary};
pub use snapshot::{CacheSnapshot, SnapshotEntry, SnapshotOptions};
pub use stats::{CacheStatistics, CacheStats};
pub use storage::{estimate_size, CacheEntry, CacheStorage, FALLBACK_ENTRY_SIZE};
