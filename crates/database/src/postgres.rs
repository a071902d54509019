//! PostgreSQL-based relational store implementation.

use crate::error::{DatabaseError, DatabaseResult};
use crate::row::pg_row_to_json;
use crate::store::{PoolStatus, RelationalStore};
use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode as SqlxPgSslMode};
use sqlx::{Pool, Postgres};
use std::str::FromStr;
use std::time::Duration;
use textorm_core::Row;
use textorm_core::config::PgSslMode;

/// SQLSTATE raised when statement_timeout cancels a query.
const QUERY_CANCELED: &str = "57014";

/// Renders a table's columns as a single-line CREATE TABLE statement, e.g.
/// `CREATE TABLE album ( albumid INTEGER, title TEXT, artistid INTEGER )`.
///
/// `$1` is an optional schema name; when NULL the table is resolved along the
/// connection's search_path. `$2` is the bare table name.
const SCHEMA_QUERY: &str = r#"
    SELECT 'CREATE TABLE ' || c.table_name || ' ( '
        || string_agg(c.column_name || ' ' || upper(c.data_type), ', ' ORDER BY c.ordinal_position)
        || ' )'
    FROM information_schema.columns c
    WHERE c.table_name = $2
      AND (
        ($1::text IS NULL AND c.table_schema = ANY (current_schemas(false)))
        OR c.table_schema = $1
      )
    GROUP BY c.table_schema, c.table_name
    ORDER BY array_position(current_schemas(false), c.table_schema::name) NULLS LAST
    LIMIT 1
"#;

/// Pool sizing and execution bound for a Postgres store.
#[derive(Clone, Copy, Debug)]
pub struct PgPoolSettings {
    pub min_connections: u32,
    pub max_connections: u32,
    /// Applied as statement_timeout on every pooled connection.
    pub statement_timeout: Option<Duration>,
}

impl Default for PgPoolSettings {
    fn default() -> Self {
        Self {
            min_connections: 1,
            max_connections: 5,
            statement_timeout: Some(Duration::from_secs(textorm_core::DEFAULT_QUERY_TIMEOUT_SECS)),
        }
    }
}

/// PostgreSQL-based relational store.
pub struct PostgresStore {
    pool: Pool<Postgres>,
    statement_timeout: Option<Duration>,
}

impl PostgresStore {
    /// Create a new PostgreSQL store from a connection URL.
    pub async fn from_url(url: &str, settings: PgPoolSettings) -> DatabaseResult<Self> {
        let opts = PgConnectOptions::from_str(url)?;
        tracing::info!("Connecting to PostgreSQL using connection URL");
        Self::connect(opts, settings).await
    }

    /// Create a new PostgreSQL store from individual connection parameters.
    ///
    /// This allows credentials to be passed separately, enabling better
    /// secret management (e.g., passwords via environment variables).
    #[allow(clippy::too_many_arguments)]
    pub async fn from_params(
        host: &str,
        port: u16,
        username: Option<&str>,
        password: Option<&str>,
        database: &str,
        ssl_mode: Option<PgSslMode>,
        settings: PgPoolSettings,
    ) -> DatabaseResult<Self> {
        let mut opts = PgConnectOptions::new()
            .host(host)
            .port(port)
            .database(database);

        if let Some(user) = username {
            opts = opts.username(user);
        }

        if let Some(pass) = password {
            opts = opts.password(pass);
        }

        if let Some(mode) = ssl_mode {
            let sqlx_mode = match mode {
                PgSslMode::Disable => SqlxPgSslMode::Disable,
                PgSslMode::Prefer => SqlxPgSslMode::Prefer,
                PgSslMode::Require => SqlxPgSslMode::Require,
            };
            opts = opts.ssl_mode(sqlx_mode);
        }

        // Log connection info without password
        tracing::info!(
            host = host,
            port = port,
            database = database,
            username = username.unwrap_or("<none>"),
            ssl_mode = ?ssl_mode,
            "Connecting to PostgreSQL with individual parameters"
        );

        Self::connect(opts, settings).await
    }

    async fn connect(mut opts: PgConnectOptions, settings: PgPoolSettings) -> DatabaseResult<Self> {
        if settings.min_connections > settings.max_connections {
            return Err(DatabaseError::Config(format!(
                "min_connections ({}) exceeds max_connections ({})",
                settings.min_connections, settings.max_connections
            )));
        }

        // The client-side timer in the executor drops the future; this makes
        // the server abandon the statement as well.
        if let Some(timeout) = settings.statement_timeout {
            let timeout_ms = timeout.as_millis();
            opts = opts.options([("statement_timeout", format!("{timeout_ms}ms"))]);
            tracing::info!("PostgreSQL statement_timeout set to {}ms", timeout_ms);
        }

        let pool = PgPoolOptions::new()
            .min_connections(settings.min_connections)
            .max_connections(settings.max_connections)
            .connect_with(opts)
            .await?;

        tracing::info!(
            min_connections = settings.min_connections,
            max_connections = settings.max_connections,
            "PostgreSQL pool ready"
        );

        Ok(Self {
            pool,
            statement_timeout: settings.statement_timeout,
        })
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &Pool<Postgres> {
        &self.pool
    }
}

/// Split an optionally schema-qualified name into (schema, table).
fn split_qualified(table: &str) -> (Option<&str>, &str) {
    match table.split_once('.') {
        Some((schema, name)) if !schema.is_empty() && !name.is_empty() => (Some(schema), name),
        _ => (None, table),
    }
}

fn is_query_canceled(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|db| db.code())
        .is_some_and(|code| code == QUERY_CANCELED)
}

#[async_trait]
impl RelationalStore for PostgresStore {
    async fn fetch_schema(&self, table: &str) -> DatabaseResult<Option<String>> {
        let (schema, name) = split_qualified(table);
        let sql: Option<String> = sqlx::query_scalar(SCHEMA_QUERY)
            .bind(schema)
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(sql)
    }

    async fn fetch(&self, sql: &str) -> DatabaseResult<Vec<Row>> {
        let mut conn = self.pool.acquire().await?;
        // Simple query protocol: no prepared statement, text-format values.
        match sqlx::Executor::fetch_all(&mut *conn, sqlx::raw_sql(sql)).await {
            Ok(rows) => Ok(rows.iter().map(pg_row_to_json).collect()),
            Err(err) if is_query_canceled(&err) => Err(DatabaseError::QueryTimeout(
                self.statement_timeout.unwrap_or_default(),
            )),
            Err(err) => Err(err.into()),
        }
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
        "postgres"
    }
}
