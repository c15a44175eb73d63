//! Export/import snapshot format
//!
//! The document is unversioned and only meant to be read back by the same
//! build that wrote it.

use crate::config::{CacheConfig, EvictionPolicy};
use crate::error::CacheError;
use crate::stats::CacheStats;
use crate::storage::CacheEntry;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One exported cache entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotEntry<T> {
    pub key: String,
    pub data: T,
    pub timestamp: u64,
    pub last_accessed: u64,
    pub hits: u64,
    pub size: usize,
}

impl<T: Clone> SnapshotEntry<T> {
    pub fn from_entry(key: &str, entry: &CacheEntry<T>) -> Self {
        Self {
            key: key.to_string(),
            data: entry.data.clone(),
            timestamp: entry.timestamp,
            last_accessed: entry.last_accessed,
            hits: entry.hits,
            size: entry.size,
        }
    }
}

/// Serializable subset of [`CacheConfig`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotOptions {
    pub max_entries: usize,
    pub max_size: usize,
    pub ttl_ms: u64,
    pub eviction_strategy: EvictionPolicy,
    pub enable_stats: bool,
}

impl From<&CacheConfig> for SnapshotOptions {
    fn from(config: &CacheConfig) -> Self {
        Self {
            max_entries: config.max_entries,
            max_size: config.max_size,
            ttl_ms: config.ttl_ms(),
            eviction_strategy: config.eviction_strategy,
            enable_stats: config.enable_stats,
        }
    }
}

/// Full cache snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSnapshot<T> {
    pub entries: Vec<SnapshotEntry<T>>,
    #[serde(default)]
    pub stats: CacheStats,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<SnapshotOptions>,
}

impl<T> CacheSnapshot<T> {
    /// Parse and validate a snapshot document
    ///
    /// Malformed JSON, a wrong shape or a payload that does not decode as
    /// `T` are all reported as [`CacheError::CorruptedData`].
    pub fn parse(json: &str) -> Result<Self, CacheError>
    where
        T: serde::de::DeserializeOwned,
    {
        let snapshot: Self =
            serde_json::from_str(json).map_err(|e| CacheError::CorruptedData(e.to_string()))?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    /// Check structural invariants that serde cannot express
    pub fn validate(&self) -> Result<(), CacheError> {
        let mut seen = HashSet::with_capacity(self.entries.len());
        for entry in &self.entries {
            if !seen.insert(entry.key.as_str()) {
                return Err(CacheError::CorruptedData(format!(
                    "duplicate key in snapshot: {}",
                    entry.key
                )));
            }
        }
        Ok(())
    }
}
