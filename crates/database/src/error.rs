//! Relational store error types.

use std::time::Duration;
use thiserror::Error;

/// Relational store operation errors.
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("schema not found for table: {0}")]
    SchemaNotFound(String),

    #[error("failed to fetch schema for table {table}: {message}")]
    SchemaFetch { table: String, message: String },

    #[error("query exceeded timeout of {}s", .0.as_secs_f64())]
    QueryTimeout(Duration),

    #[error("query execution failed: {0}")]
    Execution(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type for relational store operations.
pub type DatabaseResult<T> = std::result::Result<T, DatabaseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_message_includes_bound() {
        let err = DatabaseError::QueryTimeout(Duration::from_millis(1500));
        assert_eq!(err.to_string(), "query exceeded timeout of 1.5s");
    }

    #[test]
    fn test_schema_fetch_message_names_table() {
        let err = DatabaseError::SchemaFetch {
            table: "setting".to_string(),
            message: "connection reset".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "failed to fetch schema for table setting: connection reset"
        );
    }
}
