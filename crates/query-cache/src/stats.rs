//! Cache statistics tracking

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time view of the cache counters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    /// Entries dropped because their TTL ran out
    pub expirations: u64,
    /// Current number of entries
    pub entries: u64,
    /// Current estimated size in bytes
    pub total_size: u64,
    /// `hits / (hits + misses)`, or 0.0 before any lookup
    pub hit_rate: f64,
}

impl CacheStats {
    /// Get total lookups (hits + misses)
    pub fn total_requests(&self) -> u64 {
        self.hits + self.misses
    }
}

/// Counters for cache performance monitoring
///
/// Hit, miss, eviction and expiration counters only move when stats are
/// enabled. The entry count and total size are snapshots that are always
/// kept current.
#[derive(Debug, Default)]
pub struct CacheStatistics {
    enabled: bool,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    expirations: AtomicU64,
    entries: AtomicU64,
    total_size: AtomicU64,
}

impl CacheStatistics {
    /// Create new cache statistics
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            ..Default::default()
        }
    }

    /// Record a cache hit
    pub fn record_hit(&self) {
        self.bump(&self.hits);
    }

    /// Record a cache miss
    pub fn record_miss(&self) {
        self.bump(&self.misses);
    }

    /// Record an eviction
    pub fn record_eviction(&self) {
        self.bump(&self.evictions);
    }

    /// Record a TTL expiration
    pub fn record_expiration(&self) {
        self.bump(&self.expirations);
    }

    /// Overwrite the current size and entry count
    pub fn update_size(&self, current_size: usize, current_entries: usize) {
        self.total_size.store(current_size as u64, Ordering::Relaxed);
        self.entries.store(current_entries as u64, Ordering::Relaxed);
    }

    /// Take a snapshot of all counters
    pub fn get_stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        CacheStats {
            hits,
            misses,
            evictions: self.evictions.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
            entries: self.entries.load(Ordering::Relaxed),
            total_size: self.total_size.load(Ordering::Relaxed),
            hit_rate: if total == 0 {
                0.0
            } else {
                hits as f64 / total as f64
            },
        }
    }

    /// Reset all statistics
    pub fn reset(&self) {
        for counter in [
            &self.hits,
            &self.misses,
            &self.evictions,
            &self.expirations,
            &self.entries,
            &self.total_size,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }

    /// Restore hit and miss counters from an exported snapshot
    ///
    /// Ignored when stats are disabled.
    pub fn import(&self, hits: u64, misses: u64) {
        if self.enabled {
            self.hits.store(hits, Ordering::Relaxed);
            self.misses.store(misses, Ordering::Relaxed);
        }
    }

    fn bump(&self, counter: &AtomicU64) {
        if self.enabled {
            counter.fetch_add(1, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_recording() {
        let stats = CacheStatistics::new(true);

        stats.record_hit();
        stats.record_hit();
        stats.record_miss();

        let snapshot = stats.get_stats();
        assert_eq!(snapshot.hits, 2);
        assert_eq!(snapshot.misses, 1);
        assert_eq!(snapshot.total_requests(), 3);
    }

    #[test]
    fn test_hit_rate() {
        let stats = CacheStatistics::new(true);

        // Empty stats should return 0.0
        assert_eq!(stats.get_stats().hit_rate, 0.0);

        // 2 hits, 2 misses = 50% hit rate
        stats.record_hit();
        stats.record_hit();
        stats.record_miss();
        stats.record_miss();

        assert!((stats.get_stats().hit_rate - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_disabled_counters_stay_zero() {
        let stats = CacheStatistics::new(false);
        stats.record_hit();
        stats.record_miss();
        stats.record_eviction();
        stats.update_size(128, 3);

        let snapshot = stats.get_stats();
        assert_eq!(snapshot.hits, 0);
        assert_eq!(snapshot.misses, 0);
        assert_eq!(snapshot.evictions, 0);
        assert_eq!(snapshot.entries, 3);
        assert_eq!(snapshot.total_size, 128);
    }

    #[test]
    fn test_update_size_overwrites() {
        let stats = CacheStatistics::new(true);
        stats.update_size(100, 2);
        stats.update_size(40, 1);

        let snapshot = stats.get_stats();
        assert_eq!(snapshot.total_size, 40);
        assert_eq!(snapshot.entries, 1);
    }

    #[test]
    fn test_reset() {
        let stats = CacheStatistics::new(true);
        stats.record_hit();
        stats.record_miss();
        stats.record_eviction();
        stats.update_size(10, 1);

        stats.reset();

        assert_eq!(stats.get_stats(), CacheStats::default());
    }

    #[test]
    fn test_import_restores_hits_and_misses() {
        let stats = CacheStatistics::new(true);
        stats.record_eviction();
        stats.import(7, 3);

        let snapshot = stats.get_stats();
        assert_eq!(snapshot.hits, 7);
        assert_eq!(snapshot.misses, 3);
        assert_eq!(snapshot.evictions, 1);
        assert!((snapshot.hit_rate - 0.7).abs() < f64::EPSILON);
    }

    #[test]
    fn test_import_ignored_when_disabled() {
        let stats = CacheStatistics::new(false);
        stats.import(7, 3);

        let snapshot = stats.get_stats();
        assert_eq!(snapshot.hits, 0);
        assert_eq!(snapshot.misses, 0);
        assert_eq!(snapshot.hit_rate, 0.0);
    }
}
