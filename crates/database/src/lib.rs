//! Relational store access for textorm.
//!
//! This crate provides:
//! - The `RelationalStore` contract and its PostgreSQL and SQLite implementations
//! - Schema aggregation over an ordered table list
//! - Time-bounded query execution over a shared connection pool
//! - Runtime decoding of result rows into JSON

pub mod error;
pub mod executor;
pub mod postgres;
pub mod row;
pub mod schema;
pub mod store;

pub use error::{DatabaseError, DatabaseResult};
pub use executor::QueryExecutor;
pub use postgres::{PgPoolSettings, PostgresStore};
pub use schema::SchemaAggregator;
pub use store::{PoolStatus, RelationalStore, SqliteStore};

use std::sync::Arc;
use textorm_core::config::DatabaseConfig;

/// Create a relational store (and its connection pool) from configuration.
pub async fn from_config(config: &DatabaseConfig) -> DatabaseResult<Arc<dyn RelationalStore>> {
    config.validate().map_err(DatabaseError::Config)?;

    match config {
        DatabaseConfig::Sqlite {
            path,
            max_connections,
            ..
        } => {
            let store = SqliteStore::new(path, *max_connections).await?;
            Ok(Arc::new(store) as Arc<dyn RelationalStore>)
        }
        DatabaseConfig::Postgres {
            url,
            host,
            port,
            username,
            password,
            database,
            ssl_mode,
            min_connections,
            max_connections,
            ..
        } => {
            let settings = PgPoolSettings {
                min_connections: *min_connections,
                max_connections: *max_connections,
                statement_timeout: Some(config.query_timeout()),
            };
            let store = if let Some(url) = url {
                // URL takes precedence over individual fields
                PostgresStore::from_url(url, settings).await?
            } else if let (Some(host), Some(database)) = (host.as_ref(), database.as_ref()) {
                PostgresStore::from_params(
                    host,
                    port.unwrap_or(5432),
                    username.as_deref(),
                    password.as_ref().map(|p| p.expose()),
                    database,
                    *ssl_mode,
                    settings,
                )
                .await?
            } else {
                return Err(DatabaseError::Config(
                    "postgres config requires either 'url' or 'host' + 'database'".to_string(),
                ));
            };
            Ok(Arc::new(store) as Arc<dyn RelationalStore>)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[tokio::test]
    async fn test_from_config_sqlite_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("nested").join("app.db");
        let config = DatabaseConfig::Sqlite {
            path: db_path.clone(),
            max_connections: 2,
            query_timeout_secs: 30,
        };

        let store = from_config(&config).await.unwrap();
        store.health_check().await.unwrap();
        assert_eq!(store.backend_name(), "sqlite");
        assert!(db_path.exists());
    }

    #[tokio::test]
    async fn test_from_config_rejects_invalid_pool() {
        let config = DatabaseConfig::Sqlite {
            path: PathBuf::from(":memory:"),
            max_connections: 0,
            query_timeout_secs: 30,
        };
        match from_config(&config).await {
            Ok(_) => panic!("expected error"),
            Err(DatabaseError::Config(_)) => {}
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }
}
