use serde_json::{Map, Value};

/// A single result row, keyed by column name
pub type Row = Map<String, Value>;

/// Ordered positional parameters bound to a query
pub type QueryParams = Vec<Value>;

/// Build a row from `(column, value)` pairs
pub fn row<I, K>(columns: I) -> Row
where
    I: IntoIterator<Item = (K, Value)>,
    K: Into<String>,
{
    columns
        .into_iter()
        .map(|(name, value)| (name.into(), value))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_row_builder_keeps_columns() {
        let r = row([("id", json!(1)), ("name", json!("Alice"))]);
        assert_eq!(r.len(), 2);
        assert_eq!(r["id"], json!(1));
        assert_eq!(r["name"], json!("Alice"));
    }
}
