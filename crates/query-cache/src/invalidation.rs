//! Pattern-based cache invalidation
//!
//! Patterns are matched against the generated cache key, not the raw SQL,
//! so parameter values are visible to them as well.

use regex::Regex;

/// Selects cache keys to invalidate
#[derive(Debug, Clone)]
pub enum InvalidationPattern {
    /// Key contains the string
    Substring(String),
    /// Key matches the regular expression
    Regex(Regex),
}

impl InvalidationPattern {
    /// Compile a regular expression pattern
    pub fn regex(pattern: &str) -> Result<Self, regex::Error> {
        Regex::new(pattern).map(Self::Regex)
    }

    /// Check whether a cache key is selected by this pattern
    pub fn matches(&self, key: &str) -> bool {
        match self {
            InvalidationPattern::Substring(needle) => key.contains(needle.as_str()),
            InvalidationPattern::Regex(regex) => regex.is_match(key),
        }
    }
}

impl From<&str> for InvalidationPattern {
    fn from(needle: &str) -> Self {
        Self::Substring(needle.to_string())
    }
}

impl From<String> for InvalidationPattern {
    fn from(needle: String) -> Self {
        Self::Substring(needle)
    }
}

impl From<Regex> for InvalidationPattern {
    fn from(regex: Regex) -> Self {
        Self::Regex(regex)
    }
}
