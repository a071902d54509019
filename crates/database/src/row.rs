//! Conversion of driver rows into JSON objects.
//!
//! Generated queries return arbitrary columns, so rows are decoded by column
//! type at runtime rather than into fixed structs.

use serde_json::{Number, Value};
use sqlx::postgres::PgRow;
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Row as _, TypeInfo, ValueRef};
use textorm_core::{Row, insert_column};

/// Decode a Postgres row fetched over the simple query protocol.
///
/// Simple-protocol values arrive in text format, so every column is read as
/// text and then converted according to its declared type.
pub fn pg_row_to_json(row: &PgRow) -> Row {
    let mut out = Row::new();
    for column in row.columns() {
        let text: Option<String> = row.try_get_unchecked(column.ordinal()).unwrap_or(None);
        let value = match text {
            Some(text) => pg_text_to_json(column.type_info().name(), text),
            None => Value::Null,
        };
        insert_column(&mut out, column.name(), value);
    }
    out
}

/// Convert a text-format Postgres value to JSON by type name.
///
/// NUMERIC values that are not integral stay strings so no precision is lost.
pub fn pg_text_to_json(type_name: &str, text: String) -> Value {
    match type_name {
        "BOOL" => match text.as_str() {
            "t" | "true" => Value::Bool(true),
            "f" | "false" => Value::Bool(false),
            _ => Value::String(text),
        },
        "INT2" | "INT4" | "INT8" | "OID" => text
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or(Value::String(text)),
        "FLOAT4" | "FLOAT8" => text
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::String(text)),
        "NUMERIC" => text
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or(Value::String(text)),
        "JSON" | "JSONB" => serde_json::from_str(&text).unwrap_or(Value::String(text)),
        _ => Value::String(text),
    }
}

/// Decode a SQLite row using each value's runtime storage class.
pub fn sqlite_row_to_json(row: &SqliteRow) -> Row {
    let mut out = Row::new();
    for column in row.columns() {
        let idx = column.ordinal();
        let value = match row.try_get_raw(idx) {
            Ok(raw) if raw.is_null() => Value::Null,
            Ok(raw) => {
                let storage = raw.type_info().name().to_string();
                sqlite_value_to_json(row, idx, &storage)
            }
            Err(err) => {
                tracing::debug!(column = column.name(), error = %err, "Undecodable column");
                Value::Null
            }
        };
        insert_column(&mut out, column.name(), value);
    }
    out
}

fn sqlite_value_to_json(row: &SqliteRow, idx: usize, storage: &str) -> Value {
    match storage {
        "INTEGER" => row
            .try_get_unchecked::<i64, _>(idx)
            .map(Value::from)
            .unwrap_or(Value::Null),
        "BOOLEAN" => row
            .try_get_unchecked::<bool, _>(idx)
            .map(Value::Bool)
            .unwrap_or(Value::Null),
        "REAL" => row
            .try_get_unchecked::<f64, _>(idx)
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        "BLOB" => row
            .try_get_unchecked::<Vec<u8>, _>(idx)
            .map(|bytes| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
            .unwrap_or(Value::Null),
        _ => row
            .try_get_unchecked::<String, _>(idx)
            .map(Value::String)
            .unwrap_or(Value::Null),
    }
}
