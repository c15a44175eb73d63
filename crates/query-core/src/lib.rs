pub mod error;
pub mod types;

pub use error::{QueryError, Result};
pub use serde_json::Value;
pub use types::*;
