//! Eviction policies, TTL expiry and size accounting

use crate::config::{CacheConfig, EvictionPolicy};
use crate::storage::{now_millis, CacheEntry, CacheStorage};

/// Decides when and what to evict, and tracks the aggregate entry size
#[derive(Debug, Clone)]
pub struct EvictionStrategy {
    policy: EvictionPolicy,
    max_entries: usize,
    max_size: usize,
    ttl_ms: u64,
    current_size: usize,
}

impl EvictionStrategy {
    /// Create a strategy from the cache configuration
    ///
    /// A `max_entries` of zero is treated as one.
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            policy: config.eviction_strategy,
            max_entries: config.max_entries.max(1),
            max_size: config.max_size,
            ttl_ms: config.ttl_ms(),
            current_size: 0,
        }
    }

    pub fn policy(&self) -> EvictionPolicy {
        self.policy
    }

    /// Check if an entry has outlived the TTL
    pub fn is_expired<T>(&self, entry: &CacheEntry<T>) -> bool {
        self.is_expired_at(entry, now_millis())
    }

    /// Check expiry against a fixed clock reading
    pub fn is_expired_at<T>(&self, entry: &CacheEntry<T>, now: u64) -> bool {
        self.ttl_ms != 0 && now.saturating_sub(entry.timestamp) > self.ttl_ms
    }

    /// Evict entries until an insertion of `incoming_size` fits
    ///
    /// Must run before the new entry is inserted, so it is never its own
    /// victim. Returns the evicted keys in eviction order.
    pub fn evict_if_needed<T>(
        &mut self,
        storage: &mut CacheStorage<T>,
        incoming_size: usize,
    ) -> Vec<String> {
        let mut evicted = Vec::new();
        if !self.over_budget(storage.len(), incoming_size) {
            return evicted;
        }

        if self.policy == EvictionPolicy::Ttl {
            evicted.extend(self.sweep_expired(storage));
        }

        while !storage.is_empty() && self.over_budget(storage.len(), incoming_size) {
            let Some(victim) = self.select_victim(storage) else {
                break;
            };
            if let Some(entry) = storage.delete(&victim) {
                self.update_size(-(entry.size as isize));
            }
            evicted.push(victim);
        }

        evicted
    }

    /// Remove every expired entry, returning the removed keys
    pub fn sweep_expired<T>(&mut self, storage: &mut CacheStorage<T>) -> Vec<String> {
        let now = now_millis();
        let expired: Vec<String> = storage
            .entries()
            .into_iter()
            .filter(|(_, entry)| self.is_expired_at(*entry, now))
            .map(|(key, _)| key.to_string())
            .collect();

        for key in &expired {
            if let Some(entry) = storage.delete(key) {
                self.update_size(-(entry.size as isize));
            }
        }
        expired
    }

    /// Adjust the running size total, clamping at zero
    pub fn update_size(&mut self, delta: isize) {
        self.current_size = if delta >= 0 {
            self.current_size.saturating_add(delta as usize)
        } else {
            self.current_size.saturating_sub(delta.unsigned_abs())
        };
    }

    pub fn current_size(&self) -> usize {
        self.current_size
    }

    pub fn reset(&mut self) {
        self.current_size = 0;
    }

    fn over_budget(&self, entry_count: usize, incoming_size: usize) -> bool {
        self.current_size.saturating_add(incoming_size) > self.max_size
            || entry_count >= self.max_entries
    }

    fn select_victim<T>(&self, storage: &CacheStorage<T>) -> Option<String> {
        match self.policy {
            EvictionPolicy::Lru => storage.least_recently_used().map(str::to_string),
            // entries() is in insertion order, so min_by_key keeps the earliest on ties
            EvictionPolicy::Lfu => storage
                .entries()
                .into_iter()
                .min_by_key(|(_, entry)| entry.hits)
                .map(|(key, _)| key.to_string()),
            EvictionPolicy::Fifo | EvictionPolicy::Ttl => storage
                .entries()
                .into_iter()
                .min_by_key(|(_, entry)| (entry.timestamp, entry.sequence))
                .map(|(key, _)| key.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::KeyGenerator;
    use std::thread;
    use std::time::Duration;

    fn strategy(policy: EvictionPolicy, max_entries: usize, ttl: Duration) -> EvictionStrategy {
        EvictionStrategy::new(
            &CacheConfig::default()
                .with_eviction_strategy(policy)
                .with_max_entries(max_entries)
                .with_ttl(ttl),
        )
    }

    fn insert(
        strategy: &mut EvictionStrategy,
        storage: &mut CacheStorage<u32>,
        key: &str,
        size: usize,
    ) -> Vec<String> {
        let evicted = strategy.evict_if_needed(storage, size);
        storage.set(key.to_string(), CacheEntry::new(0, size));
        strategy.update_size(size as isize);
        evicted
    }

    #[test]
    fn test_zero_ttl_never_expires() {
        let strategy = strategy(EvictionPolicy::Lru, 10, Duration::ZERO);
        let mut entry = CacheEntry::new(1u32, 1);
        entry.timestamp = 0;
        assert!(!strategy.is_expired(&entry));
    }

    #[test]
    fn test_is_expired_after_ttl() {
        let strategy = strategy(EvictionPolicy::Lru, 10, Duration::from_millis(100));
        let entry = CacheEntry::new(1u32, 1);
        assert!(!strategy.is_expired_at(&entry, entry.timestamp + 100));
        assert!(strategy.is_expired_at(&entry, entry.timestamp + 101));
    }

    #[test]
    fn test_update_size_clamps_at_zero() {
        let mut strategy = strategy(EvictionPolicy::Lru, 10, Duration::ZERO);
        strategy.update_size(10);
        strategy.update_size(-25);
        assert_eq!(strategy.current_size(), 0);

        strategy.update_size(5);
        strategy.reset();
        assert_eq!(strategy.current_size(), 0);
    }

    #[test]
    fn test_empty_storage_is_noop() {
        let mut strategy = strategy(EvictionPolicy::Lru, 1, Duration::ZERO);
        let mut storage = CacheStorage::<u32>::new(KeyGenerator::default());
        assert!(strategy.evict_if_needed(&mut storage, usize::MAX / 2).is_empty());
    }

    #[test]
    fn test_lru_evicts_least_recently_accessed() {
        let mut strategy = strategy(EvictionPolicy::Lru, 2, Duration::ZERO);
        let mut storage = CacheStorage::new(KeyGenerator::default());
        insert(&mut strategy, &mut storage, "a", 1);
        insert(&mut strategy, &mut storage, "b", 1);
        storage.update_access_order("a");

        let evicted = insert(&mut strategy, &mut storage, "c", 1);
        assert_eq!(evicted, vec!["b"]);
        assert_eq!(strategy.current_size(), 2);
    }

    #[test]
    fn test_lfu_evicts_least_hit() {
        let mut strategy = strategy(EvictionPolicy::Lfu, 2, Duration::ZERO);
        let mut storage = CacheStorage::new(KeyGenerator::default());
        insert(&mut strategy, &mut storage, "a", 1);
        insert(&mut strategy, &mut storage, "b", 1);
        for _ in 0..3 {
            storage.get_mut("a").unwrap().record_hit();
        }
        storage.get_mut("b").unwrap().record_hit();

        let evicted = insert(&mut strategy, &mut storage, "c", 1);
        assert_eq!(evicted, vec!["b"]);
    }

    #[test]
    fn test_lfu_tie_goes_to_earliest_inserted() {
        let mut strategy = strategy(EvictionPolicy::Lfu, 2, Duration::ZERO);
        let mut storage = CacheStorage::new(KeyGenerator::default());
        insert(&mut strategy, &mut storage, "a", 1);
        insert(&mut strategy, &mut storage, "b", 1);
        storage.update_access_order("a");

        let evicted = insert(&mut strategy, &mut storage, "c", 1);
        assert_eq!(evicted, vec!["a"]);
    }

    #[test]
    fn test_fifo_ignores_access_pattern() {
        let mut strategy = strategy(EvictionPolicy::Fifo, 2, Duration::ZERO);
        let mut storage = CacheStorage::new(KeyGenerator::default());
        insert(&mut strategy, &mut storage, "a", 1);
        insert(&mut strategy, &mut storage, "b", 1);
        storage.get_mut("a").unwrap().record_hit();
        storage.update_access_order("a");

        let evicted = insert(&mut strategy, &mut storage, "c", 1);
        assert_eq!(evicted, vec!["a"]);
    }

    #[test]
    fn test_size_budget_evicts_multiple() {
        let mut strategy = EvictionStrategy::new(
            &CacheConfig::default()
                .with_max_entries(100)
                .with_max_size(100)
                .with_ttl(Duration::ZERO),
        );
        let mut storage = CacheStorage::new(KeyGenerator::default());
        insert(&mut strategy, &mut storage, "a", 40);
        insert(&mut strategy, &mut storage, "b", 40);

        let evicted = insert(&mut strategy, &mut storage, "c", 90);
        assert_eq!(evicted, vec!["a", "b"]);
        assert_eq!(strategy.current_size(), 90);
        assert_eq!(storage.len(), 1);
    }

    #[test]
    fn test_ttl_policy_sweeps_expired_first() {
        let mut strategy = strategy(EvictionPolicy::Ttl, 3, Duration::from_millis(50));
        let mut storage = CacheStorage::new(KeyGenerator::default());
        insert(&mut strategy, &mut storage, "a", 1);
        insert(&mut strategy, &mut storage, "b", 1);

        thread::sleep(Duration::from_millis(100));
        insert(&mut strategy, &mut storage, "c", 1);

        let evicted = insert(&mut strategy, &mut storage, "d", 1);
        assert_eq!(evicted, vec!["a", "b"]);
        assert!(storage.has("c"));
        assert_eq!(strategy.current_size(), 2);
    }

    #[test]
    fn test_ttl_policy_falls_back_to_oldest() {
        let mut strategy = strategy(EvictionPolicy::Ttl, 2, Duration::from_secs(60));
        let mut storage = CacheStorage::new(KeyGenerator::default());
        insert(&mut strategy, &mut storage, "a", 1);
        insert(&mut strategy, &mut storage, "b", 1);
        storage.update_access_order("a");

        let evicted = insert(&mut strategy, &mut storage, "c", 1);
        assert_eq!(evicted, vec!["a"]);
    }
}
