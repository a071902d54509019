//! Cache entries and query results.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One result row: column name to JSON value, in column order.
///
/// Repeated column names are disambiguated with a numeric suffix, see
/// [`insert_column`].
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Append a column to `row`, keeping every value.
///
/// A name already present becomes `name_2`, `name_3` and so on, taking the
/// first suffix not yet used in the row.
pub fn insert_column(row: &mut Row, name: &str, value: serde_json::Value) {
    if !row.contains_key(name) {
        row.insert(name.to_string(), value);
        return;
    }
    let mut n = 2usize;
    loop {
        let candidate = format!("{name}_{n}");
        if !row.contains_key(&candidate) {
            row.insert(candidate, value);
            return;
        }
        n += 1;
    }
}

/// Field holding the validated SQL text.
pub const FIELD_SQL_QUERY: &str = "sql_query";

/// Field holding the schema blob the query was generated from.
pub const FIELD_SCHEMAS: &str = "schemas";

/// The cached outcome of one successful generation.
///
/// Stored as a field map under the request fingerprint. Entries are written
/// once, after validation, and never updated by textorm.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Validated SQL text.
    pub sql_query: String,
    /// Schema blob the query was generated against.
    pub schemas: String,
}

impl CacheEntry {
    /// Create a new entry.
    pub fn new(sql_query: impl Into<String>, schemas: impl Into<String>) -> Self {
        Self {
            sql_query: sql_query.into(),
            schemas: schemas.into(),
        }
    }

    /// Convert into the field map written to the cache store.
    pub fn to_fields(&self) -> HashMap<String, String> {
        HashMap::from([
            (FIELD_SQL_QUERY.to_string(), self.sql_query.clone()),
            (FIELD_SCHEMAS.to_string(), self.schemas.clone()),
        ])
    }

    /// Rebuild an entry from a stored field map.
    ///
    /// An entry without a non-empty `sql_query` is malformed. A missing
    /// `schemas` field reads as empty. Unknown fields are ignored.
    pub fn from_fields(fields: &HashMap<String, String>) -> crate::Result<Self> {
        let sql_query = fields
            .get(FIELD_SQL_QUERY)
            .filter(|q| !q.trim().is_empty())
            .ok_or_else(|| {
                crate::Error::MalformedCacheEntry(format!("missing {FIELD_SQL_QUERY} field"))
            })?;
        let schemas = fields.get(FIELD_SCHEMAS).cloned().unwrap_or_default();
        Ok(Self {
            sql_query: sql_query.clone(),
            schemas,
        })
    }
}

/// Result of one request.
///
/// `data` is `None` unless execution was requested. Rows are never cached.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    /// The resolved SQL query.
    pub query: String,
    /// Rows returned by executing the query, when requested.
    pub data: Option<Vec<Row>>,
}

impl QueryResult {
    /// A result carrying only the query text.
    pub fn query_only(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            data: None,
        }
    }

    /// A result carrying the query and its rows.
    pub fn with_data(query: impl Into<String>, data: Vec<Row>) -> Self {
        Self {
            query: query.into(),
            data: Some(data),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cache_entry_fields_roundtrip() {
        let entry = CacheEntry::new("SELECT * FROM setting", "CREATE TABLE setting (id integer)");
        let fields = entry.to_fields();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[FIELD_SQL_QUERY], "SELECT * FROM setting");
        assert_eq!(CacheEntry::from_fields(&fields).unwrap(), entry);
    }

    #[test]
    fn test_cache_entry_requires_sql_query() {
        let fields = HashMap::from([(FIELD_SCHEMAS.to_string(), "x".to_string())]);
        assert!(CacheEntry::from_fields(&fields).is_err());

        let blank = HashMap::from([(FIELD_SQL_QUERY.to_string(), "  ".to_string())]);
        assert!(CacheEntry::from_fields(&blank).is_err());
    }

    #[test]
    fn test_cache_entry_tolerates_missing_schemas_and_extra_fields() {
        let fields = HashMap::from([
            (FIELD_SQL_QUERY.to_string(), "SELECT 1".to_string()),
            ("created_by".to_string(), "someone".to_string()),
        ]);
        let entry = CacheEntry::from_fields(&fields).unwrap();
        assert_eq!(entry.sql_query, "SELECT 1");
        assert_eq!(entry.schemas, "");
    }

    #[test]
    fn test_query_result_serializes_null_data() {
        let result = QueryResult::query_only("SELECT 1");
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value, json!({"query": "SELECT 1", "data": null}));
    }

    #[test]
    fn test_insert_column_keeps_order_and_duplicates() {
        let mut row = Row::new();
        insert_column(&mut row, "zeta", json!(9));
        insert_column(&mut row, "alpha", json!(8));
        insert_column(&mut row, "id", json!(1));
        insert_column(&mut row, "id_2", json!("taken"));
        insert_column(&mut row, "id", json!(2));

        let keys: Vec<&str> = row.keys().map(String::as_str).collect();
        assert_eq!(keys, ["zeta", "alpha", "id", "id_2", "id_3"]);
        assert_eq!(row["id"], json!(1));
        assert_eq!(row["id_3"], json!(2));
    }

    #[test]
    fn test_query_result_with_rows() {
        let mut row = Row::new();
        row.insert("id".to_string(), json!(1));
        let result = QueryResult::with_data("SELECT id FROM t", vec![row]);
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value, json!({"query": "SELECT id FROM t", "data": [{"id": 1}]}));
    }
}
