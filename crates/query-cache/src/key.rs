//! Cache key generation

use serde_json::{json, Value};
use std::fmt;
use std::sync::Arc;

type KeyFn = dyn Fn(&str, &[Value]) -> String + Send + Sync;

/// Derives a cache key from query text and positional parameters
///
/// The wrapped function must be deterministic and total: the same query and
/// parameters always map to the same key for a given cache instance. A
/// generator that panics is a configuration bug and is not caught.
#[derive(Clone)]
pub struct KeyGenerator {
    generate: Arc<KeyFn>,
    name: &'static str,
}

impl KeyGenerator {
    /// Wrap a custom key function
    pub fn new<F>(generate: F) -> Self
    where
        F: Fn(&str, &[Value]) -> String + Send + Sync + 'static,
    {
        Self {
            generate: Arc::new(generate),
            name: "custom",
        }
    }

    /// Structural JSON key of `{query, params}`, the default
    ///
    /// Whitespace and parameter order are significant.
    pub fn structural() -> Self {
        Self {
            generate: Arc::new(structural_key),
            name: "structural",
        }
    }

    /// Structural key over the query with whitespace runs collapsed
    pub fn normalized() -> Self {
        Self {
            generate: Arc::new(|query: &str, params: &[Value]| {
                structural_key(&normalize_whitespace(query), params)
            }),
            name: "normalized",
        }
    }

    /// Generate the key for a query and its parameters
    pub fn generate(&self, query: &str, params: &[Value]) -> String {
        (self.generate)(query, params)
    }
}

impl Default for KeyGenerator {
    fn default() -> Self {
        Self::structural()
    }
}

impl fmt::Debug for KeyGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("KeyGenerator").field(&self.name).finish()
    }
}

fn structural_key(query: &str, params: &[Value]) -> String {
    json!({ "query": query, "params": params }).to_string()
}

fn normalize_whitespace(query: &str) -> String {
    query.split_whitespace().collect::<Vec<_>>().join(" ")
}
