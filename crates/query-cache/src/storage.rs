//! Key/value storage for cache entries

use crate::key::KeyGenerator;
use lru::LruCache;
use serde::Serialize;
use serde_json::Value;
use std::time::{SystemTime, UNIX_EPOCH};

/// Size assumed for payloads that cannot be serialized
pub const FALLBACK_ENTRY_SIZE: usize = 1024;

/// Entry stored in the cache
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    /// Cached query results
    pub data: T,
    /// Creation time in epoch milliseconds
    pub timestamp: u64,
    /// Last hit in epoch milliseconds
    pub last_accessed: u64,
    /// Number of hits since insertion
    pub hits: u64,
    /// Estimated size in bytes
    pub size: usize,
    /// Insertion order, assigned by the storage
    pub(crate) sequence: u64,
}

impl<T> CacheEntry<T> {
    /// Create a new cache entry stamped with the current time
    pub fn new(data: T, size: usize) -> Self {
        let now = now_millis();
        Self {
            data,
            timestamp: now,
            last_accessed: now,
            hits: 0,
            size,
            sequence: 0,
        }
    }

    /// Bump the access metadata after a hit
    pub fn record_hit(&mut self) {
        self.hits += 1;
        self.last_accessed = now_millis();
    }
}

/// Current wall-clock time in epoch milliseconds
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Estimate the in-memory footprint of a payload
///
/// Uses the serialized JSON length doubled, approximating UTF-16 width.
/// Payloads that fail to serialize are counted as [`FALLBACK_ENTRY_SIZE`].
pub fn estimate_size<T: Serialize>(data: &T) -> usize {
    match serde_json::to_string(data) {
        Ok(json) => json.len() * 2,
        Err(_) => FALLBACK_ENTRY_SIZE,
    }
}

/// Map from cache key to entry
///
/// Holds no eviction policy. The recency list of the underlying unbounded
/// `LruCache` is the access order the LRU policy reads; it only moves when
/// [`CacheStorage::update_access_order`] is called.
pub struct CacheStorage<T> {
    entries: LruCache<String, CacheEntry<T>>,
    key_generator: KeyGenerator,
    next_sequence: u64,
}

impl<T> CacheStorage<T> {
    pub fn new(key_generator: KeyGenerator) -> Self {
        Self {
            entries: LruCache::unbounded(),
            key_generator,
            next_sequence: 0,
        }
    }

    pub fn generate_key(&self, query: &str, params: &[Value]) -> String {
        self.key_generator.generate(query, params)
    }

    pub fn get(&self, key: &str) -> Option<&CacheEntry<T>> {
        self.entries.peek(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut CacheEntry<T>> {
        self.entries.peek_mut(key)
    }

    /// Insert an entry, replacing any existing one at the same key
    ///
    /// The entry lands at the most-recent end of the access order. Size
    /// bookkeeping for a replaced entry is the caller's job.
    pub fn set(&mut self, key: String, mut entry: CacheEntry<T>) -> Option<CacheEntry<T>> {
        entry.sequence = self.next_sequence;
        self.next_sequence += 1;
        self.entries.put(key, entry)
    }

    pub fn delete(&mut self, key: &str) -> Option<CacheEntry<T>> {
        self.entries.pop(key)
    }

    pub fn has(&self, key: &str) -> bool {
        self.entries.contains(key)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys in insertion order
    pub fn keys(&self) -> Vec<String> {
        self.entries()
            .into_iter()
            .map(|(key, _)| key.to_string())
            .collect()
    }

    /// Entries in insertion order
    pub fn entries(&self) -> Vec<(&str, &CacheEntry<T>)> {
        let mut entries: Vec<_> = self
            .entries
            .iter()
            .map(|(key, entry)| (key.as_str(), entry))
            .collect();
        entries.sort_by_key(|(_, entry)| entry.sequence);
        entries
    }

    /// Move a key to the most-recent end of the access order
    pub fn update_access_order(&mut self, key: &str) {
        self.entries.promote(key);
    }

    /// Key at the least-recent end of the access order
    pub fn least_recently_used(&self) -> Option<&str> {
        self.entries.peek_lru().map(|(key, _)| key.as_str())
    }
}
