//! Query cache manager
//!
//! Composes storage, eviction and statistics behind one lock. Every public
//! method takes the lock once and releases it before returning, and the
//! lock is never held across an `.await`. Two concurrent misses on the same
//! key therefore both run their fetch and the last write wins.

use crate::config::CacheConfig;
use crate::error::CacheError;
use crate::eviction::EvictionStrategy;
use crate::invalidation::InvalidationPattern;
use crate::snapshot::{CacheSnapshot, SnapshotEntry, SnapshotOptions};
use crate::stats::{CacheStatistics, CacheStats};
use crate::storage::{estimate_size, now_millis, CacheEntry, CacheStorage};
use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::future::Future;
use tracing::{debug, info, warn};

/// Bounds required of a cached payload
pub trait CacheValue: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {}

impl<T> CacheValue for T where T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {}

/// Outcome of [`QueryCacheManager::lookup`]
///
/// A hit is available immediately; a miss hands back the pending fetch,
/// which stores its result in the cache when it succeeds.
pub enum Lookup<'a, T, E> {
    Hit(T),
    Fetch(BoxFuture<'a, Result<T, E>>),
}

impl<'a, T, E> Lookup<'a, T, E> {
    pub fn is_hit(&self) -> bool {
        matches!(self, Lookup::Hit(_))
    }

    /// Wait for the value, running the fetch on a miss
    pub async fn resolve(self) -> Result<T, E> {
        match self {
            Lookup::Hit(data) => Ok(data),
            Lookup::Fetch(fetch) => fetch.await,
        }
    }
}

/// A query to preload with [`QueryCacheManager::warm_up`]
pub struct WarmUpQuery<'a, T> {
    pub sql: String,
    pub params: Vec<Value>,
    fetch: Box<dyn FnOnce() -> BoxFuture<'a, anyhow::Result<T>> + Send + 'a>,
}

impl<'a, T> WarmUpQuery<'a, T> {
    pub fn new<F, Fut>(sql: impl Into<String>, params: Vec<Value>, fetch: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'a,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'a,
    {
        Self {
            sql: sql.into(),
            params,
            fetch: Box::new(move || fetch().boxed()),
        }
    }
}

/// Counts from one warm-up pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WarmUpSummary {
    /// Fetched and stored
    pub loaded: usize,
    /// Already cached, or too large to store
    pub skipped: usize,
    /// Fetch returned an error
    pub failed: usize,
}

struct CacheState<T> {
    storage: CacheStorage<T>,
    eviction: EvictionStrategy,
}

impl<T> CacheState<T> {
    /// Remove an entry and release its size
    fn remove(&mut self, key: &str) -> Option<CacheEntry<T>> {
        let entry = self.storage.delete(key)?;
        self.eviction.update_size(-(entry.size as isize));
        Some(entry)
    }
}

/// Bounded query result cache
pub struct QueryCacheManager<T> {
    state: Mutex<CacheState<T>>,
    stats: CacheStatistics,
    config: CacheConfig,
}

impl<T: CacheValue> QueryCacheManager<T> {
    /// Create a new cache with the given configuration
    pub fn new(config: CacheConfig) -> Self {
        Self {
            state: Mutex::new(CacheState {
                storage: CacheStorage::new(config.key_generator.clone()),
                eviction: EvictionStrategy::new(&config),
            }),
            stats: CacheStatistics::new(config.enable_stats),
            config,
        }
    }

    /// Create a cache with default configuration
    pub fn with_defaults() -> Self {
        Self::new(CacheConfig::default())
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Compute the cache key for a query and its parameters
    pub fn generate_key(&self, query: &str, params: &[Value]) -> String {
        self.state.lock().storage.generate_key(query, params)
    }

    /// Look up a cached result
    ///
    /// An expired entry is removed and reported as a miss.
    pub fn get(&self, query: &str, params: &[Value]) -> Option<T> {
        self.get_key(&self.generate_key(query, params))
    }

    /// Look up a cached result by precomputed key
    pub fn get_key(&self, key: &str) -> Option<T> {
        let mut state = self.state.lock();

        let expired = match state.storage.get(key) {
            Some(entry) => state.eviction.is_expired(entry),
            None => {
                self.stats.record_miss();
                debug!("Cache miss for {}", key);
                return None;
            }
        };

        if expired {
            state.remove(key);
            self.stats.record_expiration();
            self.stats.record_miss();
            self.refresh_stats(&state);
            debug!("Cache entry expired for {}", key);
            return None;
        }

        let data = state.storage.get_mut(key).map(|entry| {
            entry.record_hit();
            entry.data.clone()
        });
        state.storage.update_access_order(key);
        self.stats.record_hit();
        data
    }

    /// Look up a result, preparing `fetch` to run on a miss
    ///
    /// The key is computed once, here. A successful fetch is stored under
    /// it; a failed fetch is returned unchanged and nothing is cached.
    pub fn lookup<'a, F, Fut, E>(&'a self, query: &str, params: &[Value], fetch: F) -> Lookup<'a, T, E>
    where
        F: FnOnce() -> Fut + Send + 'a,
        Fut: Future<Output = Result<T, E>> + Send + 'a,
        E: Send + 'a,
    {
        let key = self.generate_key(query, params);
        if let Some(data) = self.get_key(&key) {
            return Lookup::Hit(data);
        }

        Lookup::Fetch(
            async move {
                let data = fetch().await?;
                self.set_key(key, data.clone());
                Ok(data)
            }
            .boxed(),
        )
    }

    /// Return the cached result, or run `fetch` and cache what it returns
    pub async fn get_or_fetch<'a, F, Fut, E>(
        &'a self,
        query: &str,
        params: &[Value],
        fetch: F,
    ) -> Result<T, E>
    where
        F: FnOnce() -> Fut + Send + 'a,
        Fut: Future<Output = Result<T, E>> + Send + 'a,
        E: Send + 'a,
    {
        self.lookup(query, params, fetch).resolve().await
    }

    /// Cache a result for a query and its parameters
    ///
    /// Returns false when the payload alone is larger than `max_size`; any
    /// previous entry at the key is dropped in that case.
    pub fn set(&self, query: &str, params: &[Value], data: T) -> bool {
        self.set_key(self.generate_key(query, params), data)
    }

    /// Cache a result under a precomputed key
    pub fn set_key(&self, key: impl Into<String>, data: T) -> bool {
        let key = key.into();
        let size = estimate_size(&data);

        let mut guard = self.state.lock();
        let state = &mut *guard;

        // Replacing must not push out unrelated entries
        state.remove(&key);

        if size > self.config.max_size {
            self.refresh_stats(state);
            debug!(
                "Not caching {}: {} bytes exceeds max size {}",
                key, size, self.config.max_size
            );
            return false;
        }

        let evicted = state.eviction.evict_if_needed(&mut state.storage, size);
        for victim in &evicted {
            self.stats.record_eviction();
            debug!("Evicted {} ({})", victim, state.eviction.policy());
        }

        state.storage.set(key, CacheEntry::new(data, size));
        state.eviction.update_size(size as isize);
        self.refresh_stats(state);
        true
    }

    /// Check for a fresh entry, dropping it if it has expired
    pub fn has(&self, query: &str, params: &[Value]) -> bool {
        self.has_key(&self.generate_key(query, params))
    }

    pub fn has_key(&self, key: &str) -> bool {
        let mut state = self.state.lock();

        let expired = match state.storage.get(key) {
            Some(entry) => state.eviction.is_expired(entry),
            None => return false,
        };

        if expired {
            state.remove(key);
            self.stats.record_expiration();
            self.refresh_stats(&state);
        }
        !expired
    }

    /// Remove an entry, returning whether one was present
    pub fn delete(&self, query: &str, params: &[Value]) -> bool {
        self.delete_key(&self.generate_key(query, params))
    }

    pub fn delete_key(&self, key: &str) -> bool {
        let mut state = self.state.lock();
        let removed = state.remove(key).is_some();
        if removed {
            self.stats.record_eviction();
            self.refresh_stats(&state);
        }
        removed
    }

    /// Clear all entries and reset statistics
    pub fn clear(&self) {
        let mut state = self.state.lock();
        let dropped = state.storage.len();
        state.storage.clear();
        state.eviction.reset();
        self.stats.reset();
        info!("Query cache cleared ({} entries dropped)", dropped);
    }

    /// Remove every entry whose key matches the pattern
    pub fn invalidate(&self, pattern: impl Into<InvalidationPattern>) -> usize {
        let pattern = pattern.into();
        let mut state = self.state.lock();

        let matching: Vec<String> = state
            .storage
            .keys()
            .into_iter()
            .filter(|key| pattern.matches(key))
            .collect();
        for key in &matching {
            state.remove(key);
        }

        self.refresh_stats(&state);
        debug!("Invalidated {} cache entries", matching.len());
        matching.len()
    }

    /// Expire entries that have exceeded TTL
    pub fn expire_stale(&self) -> usize {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        let expired = state.eviction.sweep_expired(&mut state.storage);
        for _ in &expired {
            self.stats.record_expiration();
        }

        self.refresh_stats(state);
        expired.len()
    }

    /// Preload results for queries that are not cached yet
    ///
    /// Queries run one after another. A failing fetch is logged and counted
    /// and does not stop the rest.
    pub async fn warm_up(&self, queries: Vec<WarmUpQuery<'_, T>>) -> WarmUpSummary {
        let mut summary = WarmUpSummary::default();

        for query in queries {
            let key = self.generate_key(&query.sql, &query.params);
            if self.has_key(&key) {
                summary.skipped += 1;
                continue;
            }

            match (query.fetch)().await {
                Ok(data) => {
                    if self.set_key(key, data) {
                        summary.loaded += 1;
                    } else {
                        summary.skipped += 1;
                    }
                }
                Err(err) => {
                    warn!("Cache warm-up failed for `{}`: {:#}", query.sql, err);
                    summary.failed += 1;
                }
            }
        }

        info!(
            "Cache warm-up finished: {} loaded, {} skipped, {} failed",
            summary.loaded, summary.skipped, summary.failed
        );
        summary
    }

    /// Serialize the fresh entries, statistics and options to JSON
    pub fn export(&self) -> Result<String, CacheError> {
        let snapshot = {
            let state = self.state.lock();
            let now = now_millis();
            let entries = state
                .storage
                .entries()
                .into_iter()
                .filter(|(_, entry)| !state.eviction.is_expired_at(*entry, now))
                .map(|(key, entry)| SnapshotEntry::from_entry(key, entry))
                .collect();

            CacheSnapshot {
                entries,
                stats: self.stats.get_stats(),
                options: Some(SnapshotOptions::from(&self.config)),
            }
        };

        Ok(serde_json::to_string(&snapshot)?)
    }

    /// Replace the cache contents with a snapshot from [`Self::export`]
    ///
    /// The snapshot is fully parsed and validated before anything is
    /// cleared, so a corrupted document leaves the cache untouched. Entries
    /// are inserted without eviction checks. Returns the number restored.
    pub fn import(&self, json: &str) -> Result<usize, CacheError> {
        let snapshot = CacheSnapshot::<T>::parse(json)?;

        let mut recency: Vec<(u64, String)> = snapshot
            .entries
            .iter()
            .map(|entry| (entry.last_accessed, entry.key.clone()))
            .collect();
        recency.sort_by_key(|(last_accessed, _)| *last_accessed);
        let restored = snapshot.entries.len();

        let mut guard = self.state.lock();
        let state = &mut *guard;
        state.storage.clear();
        state.eviction.reset();
        self.stats.reset();

        for entry in snapshot.entries {
            let size = estimate_size(&entry.data);
            state.storage.set(
                entry.key,
                CacheEntry {
                    data: entry.data,
                    timestamp: entry.timestamp,
                    last_accessed: entry.last_accessed,
                    hits: entry.hits,
                    size,
                    sequence: 0,
                },
            );
            state.eviction.update_size(size as isize);
        }
        for (_, key) in &recency {
            state.storage.update_access_order(key);
        }

        self.stats.import(snapshot.stats.hits, snapshot.stats.misses);
        self.refresh_stats(state);
        info!("Imported {} cache entries from snapshot", restored);
        Ok(restored)
    }

    /// Get cache statistics
    pub fn get_stats(&self) -> CacheStats {
        self.stats.get_stats()
    }

    /// Get current number of entries
    pub fn len(&self) -> usize {
        self.state.lock().storage.len()
    }

    /// Check if cache is empty
    pub fn is_empty(&self) -> bool {
        self.state.lock().storage.is_empty()
    }

    /// Cache keys in insertion order
    pub fn keys(&self) -> Vec<String> {
        self.state.lock().storage.keys()
    }

    fn refresh_stats(&self, state: &CacheState<T>) {
        self.stats
            .update_size(state.eviction.current_size(), state.storage.len());
    }
}

impl<T> fmt::Debug for QueryCacheManager<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("QueryCacheManager")
            .field("max_entries", &self.config.max_entries)
            .field("max_size", &self.config.max_size)
            .field("ttl", &self.config.ttl)
            .field("eviction_strategy", &self.config.eviction_strategy)
            .field("current_entries", &state.storage.len())
            .field("current_size", &state.eviction.current_size())
            .finish()
    }
}
