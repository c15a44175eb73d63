//! Shared pieces for the cache demos

use async_trait::async_trait;
use query_core::{QueryError, Result, Row, Value};
use query_executor::QueryRunner;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::debug;

/// Serves `SELECT ... FROM <table>` queries from in-memory tables
///
/// Each run sleeps for a fixed latency so cache hits are visible.
#[derive(Debug, Default)]
pub struct InMemoryRunner {
    tables: HashMap<String, Vec<Row>>,
    latency: Duration,
    runs: AtomicUsize,
}

impl InMemoryRunner {
    pub fn new(latency: Duration) -> Self {
        Self {
            latency,
            ..Self::default()
        }
    }

    /// Register a table
    pub fn with_table(mut self, name: &str, rows: Vec<Row>) -> Self {
        self.tables.insert(name.to_lowercase(), rows);
        self
    }

    /// Number of queries that reached the runner
    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }

    fn table_name(sql: &str) -> Option<String> {
        let mut words = sql.split_whitespace();
        words.find(|w| w.eq_ignore_ascii_case("from"))?;
        words
            .next()
            .map(|name| name.trim_end_matches(';').to_lowercase())
    }
}

#[async_trait]
impl QueryRunner for InMemoryRunner {
    async fn run(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.latency).await;

        let name = Self::table_name(sql)
            .ok_or_else(|| QueryError::ParseError(format!("no FROM clause in `{}`", sql)))?;
        let rows = self
            .tables
            .get(&name)
            .ok_or_else(|| QueryError::TableNotFound(name.clone()))?;

        // A single parameter filters on the `id` column
        let rows = match params.first() {
            Some(id) => rows
                .iter()
                .filter(|row| row.get("id") == Some(id))
                .cloned()
                .collect(),
            None => rows.clone(),
        };
        debug!("Ran `{}` against {} ({} rows)", sql, name, rows.len());
        Ok(rows)
    }
}
