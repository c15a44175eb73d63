//! Cache configuration options

use crate::error::CacheError;
use crate::key::KeyGenerator;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// Policy used to pick a victim when the cache is over capacity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvictionPolicy {
    /// Least recently used
    #[default]
    Lru,
    /// Least frequently used
    Lfu,
    /// Oldest inserted first
    Fifo,
    /// Expired entries first, then oldest inserted
    Ttl,
}

impl EvictionPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvictionPolicy::Lru => "lru",
            EvictionPolicy::Lfu => "lfu",
            EvictionPolicy::Fifo => "fifo",
            EvictionPolicy::Ttl => "ttl",
        }
    }
}

impl fmt::Display for EvictionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration for the query cache
///
/// Fixed for the lifetime of a cache instance. Everything except the key
/// generator can be loaded from or saved to a JSON file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Whether caching is enabled (checked by the query front-end)
    pub enabled: bool,
    /// Maximum number of entries in the cache
    pub max_entries: usize,
    /// Maximum total estimated size in bytes
    pub max_size: usize,
    /// Time-to-live for cache entries, zero disables expiry
    #[serde(rename = "ttl_ms", with = "duration_ms")]
    pub ttl: Duration,
    /// Victim selection policy
    pub eviction_strategy: EvictionPolicy,
    /// Whether hit/miss/eviction counters are recorded
    pub enable_stats: bool,
    /// Derives cache keys from query text and parameters
    #[serde(skip)]
    pub key_generator: KeyGenerator,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: 100,
            max_size: 10 * 1024 * 1024, // 10 MB
            ttl: Duration::from_secs(300), // 5 minutes
            eviction_strategy: EvictionPolicy::Lru,
            enable_stats: true,
            key_generator: KeyGenerator::default(),
        }
    }
}

impl CacheConfig {
    /// Create a new cache configuration with custom capacity bounds
    pub fn new(max_entries: usize, max_size: usize, ttl: Duration) -> Self {
        Self {
            max_entries,
            max_size,
            ttl,
            ..Default::default()
        }
    }

    /// Create a disabled cache configuration
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    /// Load a configuration from a JSON file
    pub fn from_file(path: &Path) -> Result<Self, CacheError> {
        let contents = std::fs::read_to_string(path)?;
        let config: CacheConfig = serde_json::from_str(&contents)?;
        Ok(config)
    }

    /// Save the configuration as pretty-printed JSON
    pub fn save(&self, path: &Path) -> Result<(), CacheError> {
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Set the maximum number of entries
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }

    /// Set the maximum total size in bytes
    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    /// Set the TTL duration
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set the eviction policy
    pub fn with_eviction_strategy(mut self, policy: EvictionPolicy) -> Self {
        self.eviction_strategy = policy;
        self
    }

    /// Enable or disable statistics counters
    pub fn with_stats(mut self, enable_stats: bool) -> Self {
        self.enable_stats = enable_stats;
        self
    }

    /// Replace the key generator
    pub fn with_key_generator(mut self, key_generator: KeyGenerator) -> Self {
        self.key_generator = key_generator;
        self
    }

    /// Enable or disable the cache
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// TTL in whole milliseconds
    ///
    /// A non-zero TTL under one millisecond rounds up to 1, so only a zero
    /// TTL disables expiry.
    pub fn ttl_ms(&self) -> u64 {
        duration_ms::to_millis(self.ttl)
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn to_millis(ttl: Duration) -> u64 {
        if ttl.is_zero() {
            0
        } else {
            ttl.as_millis().clamp(1, u64::MAX as u128) as u64
        }
    }

    pub fn serialize<S: Serializer>(ttl: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(to_millis(*ttl))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
