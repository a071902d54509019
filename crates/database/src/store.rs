//! Relational store trait and the SQLite implementation.

use crate::error::DatabaseResult;
use crate::row::sqlite_row_to_json;
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use textorm_core::Row;

/// Snapshot of connection pool occupancy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PoolStatus {
    /// Live connections, idle or checked out.
    pub size: u32,
    /// Live connections currently idle in the pool.
    pub idle: usize,
}

impl PoolStatus {
    /// Connections currently checked out.
    pub fn in_use(&self) -> usize {
        (self.size as usize).saturating_sub(self.idle)
    }
}

/// Relational store the pipeline reads schemas from and runs queries against.
///
/// Every call acquires one pooled connection for its own duration. The
/// connection goes back to the pool when the call finishes or when its
/// future is dropped, so a caller-side timeout never leaks a connection.
#[async_trait]
pub trait RelationalStore: Send + Sync + 'static {
    /// Fetch the CREATE TABLE text for `table`, or `None` if it does not exist.
    async fn fetch_schema(&self, table: &str) -> DatabaseResult<Option<String>>;

    /// Run a statement and return every row it produces.
    async fn fetch(&self, sql: &str) -> DatabaseResult<Vec<Row>>;

    /// Check database connectivity.
    async fn health_check(&self) -> DatabaseResult<()>;

    /// Current pool occupancy.
    fn pool_status(&self) -> PoolStatus;

    /// Static backend identifier for logs.
    fn backend_name(&self) -> &'static str;
}

/// Reads the original CREATE TABLE statement SQLite keeps for each table.
const SQLITE_SCHEMA_QUERY: &str = "SELECT sql FROM sqlite_master WHERE type = 'table' AND name = ?";

/// SQLite-based relational store.
///
/// Intended for local development and tests. SQLite cannot cancel a running
/// statement from another task, so timeouts are enforced client-side only.
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    /// Open (creating if needed) a SQLite database. `":memory:"` opens a
    /// private in-memory database that lives as long as the store.
    pub async fn new(path: impl AsRef<Path>, max_connections: u32) -> DatabaseResult<Self> {
        let path = path.as_ref();
        let in_memory = path == Path::new(":memory:");

        let opts = if in_memory {
            SqliteConnectOptions::from_str("sqlite::memory:")?
        } else {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            SqliteConnectOptions::from_str(&format!("sqlite:{}?mode=rwc", path.display()))?
                .create_if_missing(true)
                .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        };
        // Prevent transient "database is locked" errors under concurrent access.
        let opts = opts.busy_timeout(Duration::from_secs(5));

        let mut pool_opts = SqlitePoolOptions::new().max_connections(max_connections.max(1));
        if in_memory {
            // Each in-memory connection is its own database; never recycle it.
            pool_opts = pool_opts
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }
        let pool = pool_opts.connect_with(opts).await?;

        tracing::debug!(path = %path.display(), in_memory, "Opened SQLite store");

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }
}

#[async_trait]
impl RelationalStore for SqliteStore {
    async fn fetch_schema(&self, table: &str) -> DatabaseResult<Option<String>> {
        // Option<Option<_>>: no row vs. a row whose sql column is NULL.
        let sql: Option<Option<String>> = sqlx::query_scalar(SQLITE_SCHEMA_QUERY)
            .bind(table)
            .fetch_optional(&self.pool)
            .await?;
        Ok(sql.flatten().filter(|s| !s.trim().is_empty()))
    }

    async fn fetch(&self, sql: &str) -> DatabaseResult<Vec<Row>> {
        let mut conn = self.pool.acquire().await?;
        let rows = sqlx::Executor::fetch_all(&mut *conn, sqlx::raw_sql(sql)).await?;
        Ok(rows.iter().map(sqlite_row_to_json).collect())
    }

    async fn health_check(&self) -> DatabaseResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    fn pool_status(&self) -> PoolStatus {
        PoolStatus {
            size: self.pool.size(),
            idle: self.pool.num_idle(),
        }
    }

    fn backend_name(&self) -> &'static str {
        "sqlite"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_status_in_use() {
        let status = PoolStatus { size: 3, idle: 1 };
        assert_eq!(status.in_use(), 2);
        // Idle can briefly exceed size while the pool is shrinking.
        assert_eq!(PoolStatus { size: 1, idle: 2 }.in_use(), 0);
    }
}
