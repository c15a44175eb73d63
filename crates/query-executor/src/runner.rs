//! Seam to the embedded engine that actually runs queries

use async_trait::async_trait;
use query_core::{Result, Row, Value};
use std::sync::Arc;

/// Runs a query against the underlying engine and returns its rows
///
/// The cache treats `sql` as an opaque string; it never parses it.
#[async_trait]
pub trait QueryRunner: Send + Sync {
    async fn run(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>>;
}

#[async_trait]
impl<R: QueryRunner + ?Sized> QueryRunner for Arc<R> {
    async fn run(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        (**self).run(sql, params).await
    }
}
