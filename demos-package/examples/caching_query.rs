//! Query Caching Example
//!
//! Demonstrates cached query execution with eviction, TTL, invalidation,
//! warm-up and snapshots.

use anyhow::Result;
use query_cache::{CacheConfig, EvictionPolicy, InvalidationPattern, QueryCacheManager};
use query_core::{row, Row};
use query_demos::InMemoryRunner;
use query_executor::CachedQueryExecutor;
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "query_cache=info,query_executor=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    println!("=== Query Caching Example ===\n");

    // Example 1: Cached execution
    cached_execution().await?;

    // Example 2: Eviction policies
    eviction_policies();

    // Example 3: Cache with TTL
    cache_with_ttl();

    // Example 4: Invalidation and warm-up
    invalidation_and_warm_up().await?;

    // Example 5: Snapshots
    snapshots().await?;

    println!("\n=== All caching examples completed! ===");
    Ok(())
}

fn users() -> Vec<Row> {
    vec![
        row([("id", json!(1)), ("name", json!("Alice"))]),
        row([("id", json!(2)), ("name", json!("Bob"))]),
        row([("id", json!(3)), ("name", json!("Charlie"))]),
    ]
}

fn products() -> Vec<Row> {
    vec![
        row([("id", json!(10)), ("sku", json!("A-100"))]),
        row([("id", json!(11)), ("sku", json!("B-200"))]),
    ]
}

fn runner() -> Arc<InMemoryRunner> {
    Arc::new(
        InMemoryRunner::new(Duration::from_millis(50))
            .with_table("users", users())
            .with_table("products", products()),
    )
}

/// Example 1: Repeated queries are served from the cache
async fn cached_execution() -> Result<()> {
    println!("--- Example 1: Cached Execution ---\n");

    let runner = runner();
    let executor = CachedQueryExecutor::with_defaults(runner.clone());
    let sql = "SELECT * FROM users WHERE id = ?";

    for attempt in 1..=3 {
        let start = Instant::now();
        let rows = executor.execute_cached(sql, &[json!(2)]).await?;
        println!(
            "Attempt {}: {} row(s) in {:?}",
            attempt,
            rows.len(),
            start.elapsed()
        );
    }

    let stats = executor.cache_stats();
    println!("\nRunner calls: {}", runner.runs());
    println!("Hits: {}, Misses: {}", stats.hits, stats.misses);
    println!("Hit Rate: {:.1}%", stats.hit_rate * 100.0);

    Ok(())
}

/// Example 2: The same access pattern under each eviction policy
fn eviction_policies() {
    println!("\n--- Example 2: Eviction Policies ---\n");

    for policy in [
        EvictionPolicy::Lru,
        EvictionPolicy::Lfu,
        EvictionPolicy::Fifo,
        EvictionPolicy::Ttl,
    ] {
        let cache = QueryCacheManager::<Vec<Row>>::new(
            CacheConfig::default()
                .with_max_entries(2)
                .with_eviction_strategy(policy),
        );

        cache.set("Q1", &[], users());
        cache.set("Q2", &[], products());
        cache.get("Q1", &[]);
        cache.get("Q1", &[]);
        cache.set("Q3", &[], users());

        let kept: Vec<&str> = ["Q1", "Q2", "Q3"]
            .into_iter()
            .filter(|q| cache.has(q, &[]))
            .collect();
        println!("{:>5}: kept {:?}", policy, kept);
    }
}

/// Example 3: Entries expire after the TTL
fn cache_with_ttl() {
    println!("\n--- Example 3: Cache with TTL ---\n");

    let cache = QueryCacheManager::<Vec<Row>>::new(
        CacheConfig::default().with_ttl(Duration::from_millis(100)),
    );
    cache.set("SELECT * FROM users", &[], users());
    println!("Cached result with 100ms TTL");

    if cache.get("SELECT * FROM users", &[]).is_some() {
        println!("Immediate get: HIT");
    }

    println!("Waiting for TTL expiration...");
    std::thread::sleep(Duration::from_millis(150));

    if cache.get("SELECT * FROM users", &[]).is_none() {
        println!("After TTL: MISS (entry expired)");
    }
    println!("Expirations: {}", cache.get_stats().expirations);
}

/// Example 4: Drop stale results and preload hot queries
async fn invalidation_and_warm_up() -> Result<()> {
    println!("\n--- Example 4: Invalidation and Warm-up ---\n");

    let runner = runner();
    let executor = CachedQueryExecutor::with_defaults(runner.clone());

    let summary = executor
        .warm_up(vec![
            ("SELECT * FROM users".to_string(), vec![]),
            ("SELECT * FROM users WHERE id = ?".to_string(), vec![json!(1)]),
            ("SELECT * FROM products".to_string(), vec![]),
            ("SELECT * FROM orders".to_string(), vec![]),
        ])
        .await;
    println!(
        "Warm-up: {} loaded, {} skipped, {} failed",
        summary.loaded, summary.skipped, summary.failed
    );
    println!("Cached entries: {}", executor.cache_size());

    // Users changed: drop every cached query touching the table
    let removed = executor.invalidate(InvalidationPattern::regex(r"FROM users\b")?);
    println!("Invalidated {} user queries", removed);
    println!("Cached entries: {}", executor.cache_size());

    let before = runner.runs();
    executor.execute_cached("SELECT * FROM products", &[]).await?;
    println!(
        "Products served from cache: {}",
        runner.runs() == before
    );

    Ok(())
}

/// Example 5: Carry cached results over to a fresh executor
async fn snapshots() -> Result<()> {
    println!("\n--- Example 5: Snapshots ---\n");

    let first = CachedQueryExecutor::with_defaults(runner());
    first.execute_cached("SELECT * FROM users", &[]).await?;
    first.execute_cached("SELECT * FROM products", &[]).await?;

    let snapshot = first.export_cache()?;
    println!("Exported {} bytes", snapshot.len());

    let runner = runner();
    let second = CachedQueryExecutor::with_defaults(runner.clone());
    let restored = second.import_cache(&snapshot)?;
    println!("Imported {} entries", restored);

    second.execute_cached("SELECT * FROM users", &[]).await?;
    println!("Runner calls after import: {}", runner.runs());

    let stats = second.cache_stats();
    println!("\nCache Statistics:");
    println!("  Hits:        {}", stats.hits);
    println!("  Misses:      {}", stats.misses);
    println!("  Evictions:   {}", stats.evictions);
    println!("  Expirations: {}", stats.expirations);
    println!("  Entries:     {}", stats.entries);
    println!("  Size:        {} bytes", stats.total_size);

    second.clear_cache();
    println!("\nCache cleared! Entries: {}", second.cache_size());

    Ok(())
}
