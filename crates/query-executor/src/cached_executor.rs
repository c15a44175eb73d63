//! Cached Query Executor
//!
//! Wraps a query runner with a result cache for repeated queries.

use crate::runner::QueryRunner;
use query_cache::{
    CacheConfig, CacheStats, InvalidationPattern, QueryCacheManager, WarmUpQuery, WarmUpSummary,
};
use query_core::{QueryParams, Result, Row, Value};
use tracing::debug;

/// A query executor with built-in caching support
///
/// Owns its cache; one executor is created per connection.
pub struct CachedQueryExecutor<R> {
    /// The underlying query runner
    runner: R,
    /// The query cache
    cache: QueryCacheManager<Vec<Row>>,
}

impl<R: QueryRunner> CachedQueryExecutor<R> {
    /// Create a new cached executor with the given cache configuration
    pub fn new(runner: R, config: CacheConfig) -> Self {
        Self {
            runner,
            cache: QueryCacheManager::new(config),
        }
    }

    /// Create a cached executor with default configuration
    pub fn with_defaults(runner: R) -> Self {
        Self::new(runner, CacheConfig::default())
    }

    /// Execute a query with caching support
    ///
    /// When the cache is disabled the runner is called directly. Runner
    /// errors are returned as-is and never cached.
    pub async fn execute_cached(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        if !self.is_cache_enabled() {
            return self.runner.run(sql, params).await;
        }

        self.cache
            .get_or_fetch(sql, params, || self.runner.run(sql, params))
            .await
    }

    /// Execute a query with a custom cache key
    pub async fn execute_with_key(
        &self,
        cache_key: &str,
        sql: &str,
        params: &[Value],
    ) -> Result<Vec<Row>> {
        if !self.is_cache_enabled() {
            return self.runner.run(sql, params).await;
        }

        // Try cache first
        if let Some(cached_result) = self.cache.get_key(cache_key) {
            return Ok(cached_result);
        }

        // Execute the query
        let result = self.runner.run(sql, params).await?;

        // Cache the result
        self.cache.set_key(cache_key, result.clone());

        Ok(result)
    }

    /// Execute without caching (bypass cache)
    pub async fn execute_uncached(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        self.runner.run(sql, params).await
    }

    /// Preload results for the given queries through the runner
    pub async fn warm_up(&self, queries: Vec<(String, QueryParams)>) -> WarmUpSummary {
        let runner = &self.runner;
        let queries = queries
            .into_iter()
            .map(|(sql, params)| {
                let fetch_sql = sql.clone();
                let fetch_params = params.clone();
                WarmUpQuery::new(sql, params, move || async move {
                    runner
                        .run(&fetch_sql, &fetch_params)
                        .await
                        .map_err(anyhow::Error::from)
                })
            })
            .collect();

        self.cache.warm_up(queries).await
    }

    /// Get cache statistics
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.get_stats()
    }

    /// Get the underlying cache
    pub fn cache(&self) -> &QueryCacheManager<Vec<Row>> {
        &self.cache
    }

    /// Invalidate a cached query by its SQL and parameters
    pub fn invalidate_query(&self, sql: &str, params: &[Value]) -> bool {
        self.cache.delete(sql, params)
    }

    /// Invalidate every cached query whose key matches the pattern
    pub fn invalidate(&self, pattern: impl Into<InvalidationPattern>) -> usize {
        let removed = self.cache.invalidate(pattern);
        debug!("Invalidated {} cached queries", removed);
        removed
    }

    /// Clear all cached entries
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Check if caching is enabled
    pub fn is_cache_enabled(&self) -> bool {
        self.cache.config().enabled
    }

    /// Get the number of cached entries
    pub fn cache_size(&self) -> usize {
        self.cache.len()
    }

    /// Get current estimated cache size in bytes
    pub fn cache_memory_used(&self) -> usize {
        self.cache.get_stats().total_size as usize
    }

    /// Snapshot the cache as JSON
    pub fn export_cache(&self) -> Result<String> {
        Ok(self.cache.export()?)
    }

    /// Restore the cache from a JSON snapshot
    pub fn import_cache(&self, json: &str) -> Result<usize> {
        Ok(self.cache.import(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use query_core::{row, QueryError};
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct TestRunner {
        tables: HashMap<String, Vec<Row>>,
        calls: AtomicUsize,
    }

    impl TestRunner {
        fn with_table(mut self, sql: &str, rows: Vec<Row>) -> Self {
            self.tables.insert(sql.to_string(), rows);
            self
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl QueryRunner for TestRunner {
        async fn run(&self, sql: &str, _params: &[Value]) -> Result<Vec<Row>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.tables
                .get(sql)
                .cloned()
                .ok_or_else(|| QueryError::TableNotFound(sql.to_string()))
        }
    }

    fn users() -> Vec<Row> {
        vec![
            row([("id", json!(1)), ("name", json!("Alice"))]),
            row([("id", json!(2)), ("name", json!("Bob"))]),
        ]
    }

    fn runner() -> Arc<TestRunner> {
        Arc::new(
            TestRunner::default()
                .with_table("SELECT * FROM users", users())
                .with_table("SELECT * FROM products", vec![row([("sku", json!("A-1"))])]),
        )
    }

    #[tokio::test]
    async fn test_cached_execution() {
        let runner = runner();
        let executor = CachedQueryExecutor::with_defaults(runner.clone());

        // First execution - cache miss
        let result1 = executor.execute_cached("SELECT * FROM users", &[]).await;
        assert_eq!(result1.unwrap(), users());
        assert_eq!(executor.cache_stats().misses, 1);
        assert_eq!(executor.cache_stats().hits, 0);

        // Second execution with same SQL - cache hit
        let result2 = executor.execute_cached("SELECT * FROM users", &[]).await;
        assert_eq!(result2.unwrap(), users());
        assert_eq!(executor.cache_stats().hits, 1);
        assert_eq!(runner.calls(), 1);
    }

    #[tokio::test]
    async fn test_runner_error_propagates_uncached() {
        let runner = runner();
        let executor = CachedQueryExecutor::with_defaults(runner.clone());

        for _ in 0..2 {
            let err = executor
                .execute_cached("SELECT * FROM missing", &[])
                .await
                .unwrap_err();
            assert!(matches!(err, QueryError::TableNotFound(_)));
        }

        assert_eq!(runner.calls(), 2);
        assert_eq!(executor.cache_size(), 0);
    }

    #[tokio::test]
    async fn test_cache_stats() {
        let executor = CachedQueryExecutor::with_defaults(runner());

        assert_eq!(executor.cache_size(), 0);
        assert!(executor.is_cache_enabled());
        assert_eq!(executor.cache_memory_used(), 0);

        executor.execute_cached("SELECT * FROM users", &[]).await.unwrap();
        assert!(executor.cache_memory_used() > 0);
    }

    #[tokio::test]
    async fn test_cache_disabled() {
        let runner = runner();
        let executor = CachedQueryExecutor::new(runner.clone(), CacheConfig::disabled());

        assert!(!executor.is_cache_enabled());
        executor.execute_cached("SELECT * FROM users", &[]).await.unwrap();
        executor.execute_cached("SELECT * FROM users", &[]).await.unwrap();

        assert_eq!(runner.calls(), 2);
        assert_eq!(executor.cache_size(), 0);
        assert_eq!(executor.cache_stats().misses, 0);
    }

    #[tokio::test]
    async fn test_execute_with_key() {
        let runner = runner();
        let executor = CachedQueryExecutor::with_defaults(runner.clone());

        executor
            .execute_with_key("users:all", "SELECT * FROM users", &[])
            .await
            .unwrap();
        let cached = executor
            .execute_with_key("users:all", "SELECT * FROM users", &[])
            .await
            .unwrap();

        assert_eq!(cached, users());
        assert_eq!(runner.calls(), 1);
        assert_eq!(executor.cache().keys(), vec!["users:all"]);
    }

    #[tokio::test]
    async fn test_execute_uncached_bypasses_cache() {
        let runner = runner();
        let executor = CachedQueryExecutor::with_defaults(runner.clone());

        executor.execute_uncached("SELECT * FROM users", &[]).await.unwrap();

        assert_eq!(executor.cache_size(), 0);
        assert_eq!(runner.calls(), 1);
    }

    #[tokio::test]
    async fn test_invalidate_and_clear() {
        let executor = CachedQueryExecutor::with_defaults(runner());

        executor.execute_cached("SELECT * FROM users", &[]).await.unwrap();
        executor.execute_cached("SELECT * FROM products", &[]).await.unwrap();
        assert_eq!(executor.cache_size(), 2);

        assert_eq!(executor.invalidate("users"), 1);
        assert_eq!(executor.cache_size(), 1);

        assert!(executor.invalidate_query("SELECT * FROM products", &[]));
        assert_eq!(executor.cache_size(), 0);

        executor.execute_cached("SELECT * FROM users", &[]).await.unwrap();
        executor.clear_cache();
        assert_eq!(executor.cache_size(), 0);
        assert_eq!(executor.cache_stats().hits, 0);
    }

    #[tokio::test]
    async fn test_warm_up_through_runner() {
        let runner = runner();
        let executor = CachedQueryExecutor::with_defaults(runner.clone());

        let summary = executor
            .warm_up(vec![
                ("SELECT * FROM users".to_string(), vec![]),
                ("SELECT * FROM missing".to_string(), vec![]),
                ("SELECT * FROM products".to_string(), vec![]),
            ])
            .await;

        assert_eq!(summary.loaded, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(runner.calls(), 3);

        executor.execute_cached("SELECT * FROM users", &[]).await.unwrap();
        assert_eq!(runner.calls(), 3);
    }

    #[tokio::test]
    async fn test_export_import_between_executors() {
        let first = CachedQueryExecutor::with_defaults(runner());
        first.execute_cached("SELECT * FROM users", &[]).await.unwrap();
        let snapshot = first.export_cache().unwrap();

        let runner = runner();
        let second = CachedQueryExecutor::with_defaults(runner.clone());
        assert_eq!(second.import_cache(&snapshot).unwrap(), 1);

        let rows = second.execute_cached("SELECT * FROM users", &[]).await.unwrap();
        assert_eq!(rows, users());
        assert_eq!(runner.calls(), 0);
    }

    #[tokio::test]
    async fn test_corrupted_import_maps_to_cache_error() {
        let executor = CachedQueryExecutor::with_defaults(runner());
        let err = executor.import_cache("[1, 2, 3]").unwrap_err();
        assert!(matches!(err, QueryError::CacheError(_)));
    }
}
