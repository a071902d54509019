//! Orchestrator error types.

use std::time::Duration;
use textorm_cache::CacheError;
use textorm_database::DatabaseError;
use textorm_generator::GeneratorError;

/// Every failure a request or setup can surface to the caller.
#[derive(Debug, thiserror::Error)]
pub enum OrmError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("schema not found for table: {0}")]
    SchemaNotFound(String),

    #[error("failed to fetch schema for table {table}: {message}")]
    SchemaFetch { table: String, message: String },

    #[error("backend setup failed: {0}")]
    BackendSetup(String),

    #[error("generation failed: {0}")]
    Generation(String),

    #[error("Generated SQL query is not valid: \"{reason}\". Please retry with a different prompt")]
    SqlGenerator { reason: String },

    #[error("query exceeded timeout of {}s", .0.as_secs_f64())]
    QueryTimeout(Duration),

    #[error("query execution failed: {0}")]
    Execution(String),

    #[error("cache unavailable: {0}")]
    CacheUnavailable(String),

    #[error("relational store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl OrmError {
    /// Stable machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request",
            Self::SchemaNotFound(_) => "schema_not_found",
            Self::SchemaFetch { .. } => "schema_fetch_error",
            Self::BackendSetup(_) => "backend_setup_error",
            Self::Generation(_) => "generation_error",
            Self::SqlGenerator { .. } => "sql_generator_error",
            Self::QueryTimeout(_) => "query_timeout",
            Self::Execution(_) => "execution_error",
            Self::CacheUnavailable(_) => "cache_unavailable",
            Self::StoreUnavailable(_) => "store_unavailable",
            Self::Config(_) => "config_error",
        }
    }

    /// Whether repeating the same call may succeed without changing its input.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::QueryTimeout(_)
            | Self::Generation(_)
            | Self::SchemaFetch { .. }
            | Self::Execution(_)
            | Self::CacheUnavailable(_)
            | Self::StoreUnavailable(_) => true,
            Self::InvalidRequest(_)
            | Self::SqlGenerator { .. }
            | Self::SchemaNotFound(_)
            | Self::Config(_)
            | Self::BackendSetup(_) => false,
        }
    }
}

impl From<textorm_core::Error> for OrmError {
    fn from(err: textorm_core::Error) -> Self {
        match err {
            textorm_core::Error::InvalidRequest(message) => Self::InvalidRequest(message),
            other => Self::InvalidRequest(other.to_string()),
        }
    }
}

impl From<CacheError> for OrmError {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::Config(message) => Self::Config(message),
            other => Self::CacheUnavailable(other.to_string()),
        }
    }
}

impl From<DatabaseError> for OrmError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::SchemaNotFound(table) => Self::SchemaNotFound(table),
            DatabaseError::SchemaFetch { table, message } => Self::SchemaFetch { table, message },
            DatabaseError::QueryTimeout(bound) => Self::QueryTimeout(bound),
            DatabaseError::Execution(message) => Self::Execution(message),
            DatabaseError::Config(message) => Self::Config(message),
            other @ (DatabaseError::Database(_) | DatabaseError::Io(_)) => {
                Self::StoreUnavailable(other.to_string())
            }
        }
    }
}

impl From<GeneratorError> for OrmError {
    fn from(err: GeneratorError) -> Self {
        match err {
            GeneratorError::Config(message) => Self::Config(message),
            GeneratorError::Setup(message) => Self::BackendSetup(message),
            GeneratorError::AlreadyInitialized => Self::BackendSetup("already initialized".to_string()),
            GeneratorError::NotInitialized => {
                Self::Generation("backend has not been set up".to_string())
            }
            GeneratorError::Generation(message) => Self::Generation(message),
        }
    }
}

/// Result type for orchestrator operations.
pub type OrmResult<T> = std::result::Result<T, OrmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(OrmError::QueryTimeout(Duration::from_secs(30)).is_retryable());
        assert!(OrmError::Generation("503".into()).is_retryable());
        assert!(OrmError::CacheUnavailable("down".into()).is_retryable());
        assert!(!OrmError::InvalidRequest("no tables".into()).is_retryable());
        assert!(!OrmError::SchemaNotFound("ghost".into()).is_retryable());
        assert!(
            !OrmError::SqlGenerator {
                reason: "x".into()
            }
            .is_retryable()
        );
    }

    #[test]
    fn test_sql_generator_message_carries_reason() {
        let err = OrmError::SqlGenerator {
            reason: "Query contains modifier statements".to_string(),
        };
        assert_eq!(err.code(), "sql_generator_error");
        assert_eq!(
            err.to_string(),
            "Generated SQL query is not valid: \"Query contains modifier statements\". Please retry with a different prompt"
        );
    }

    #[test]
    fn test_generator_errors_split_by_phase() {
        let setup: OrmError = GeneratorError::AlreadyInitialized.into();
        assert_eq!(setup.code(), "backend_setup_error");
        assert_eq!(setup.to_string(), "backend setup failed: already initialized");

        let early: OrmError = GeneratorError::NotInitialized.into();
        assert_eq!(early.code(), "generation_error");
    }

    #[test]
    fn test_database_errors_keep_their_kind() {
        let err: OrmError = DatabaseError::SchemaNotFound("ghost".into()).into();
        assert!(matches!(err, OrmError::SchemaNotFound(ref t) if t == "ghost"));

        let err: OrmError = DatabaseError::QueryTimeout(Duration::from_secs(2)).into();
        assert_eq!(err.code(), "query_timeout");
        assert_eq!(err.to_string(), "query exceeded timeout of 2s");
    }
}
