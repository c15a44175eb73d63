pub mod cached_executor;
pub mod runner;

pub use cached_executor::CachedQueryExecutor;
pub use runner::QueryRunner;
