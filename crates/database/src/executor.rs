//! Bounded query execution.

use crate::error::{DatabaseError, DatabaseResult};
use crate::store::RelationalStore;
use std::sync::Arc;
use std::time::{Duration, Instant};
use textorm_core::Row;

/// Runs finished SQL against the relational store under a time bound.
///
/// The store call owns its pooled connection. When the bound elapses the
/// call's future is dropped, which releases that connection back to the pool
/// before `execute` returns.
#[derive(Clone)]
pub struct QueryExecutor {
    store: Arc<dyn RelationalStore>,
    timeout: Duration,
}

impl QueryExecutor {
    pub fn new(store: Arc<dyn RelationalStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// The configured execution bound.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Execute `sql` and return its rows.
    ///
    /// Fails with `QueryTimeout` when the bound elapses (or the server
    /// cancels the statement for the same reason) and with `Execution` for
    /// every other failure.
    pub async fn execute(&self, sql: &str) -> DatabaseResult<Vec<Row>> {
        let started = Instant::now();
        match tokio::time::timeout(self.timeout, self.store.fetch(sql)).await {
            Ok(Ok(rows)) => {
                tracing::debug!(
                    rows = rows.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Query executed"
                );
                Ok(rows)
            }
            Ok(Err(DatabaseError::QueryTimeout(_))) => {
                tracing::warn!(
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Query cancelled by the server after exceeding its timeout"
                );
                Err(DatabaseError::QueryTimeout(self.timeout))
            }
            Ok(Err(err)) => {
                tracing::warn!(error = %err, "Query execution failed");
                let message = match err {
                    DatabaseError::Execution(message) => message,
                    DatabaseError::Database(source) => source.to_string(),
                    other => other.to_string(),
                };
                Err(DatabaseError::Execution(message))
            }
            Err(_elapsed) => {
                tracing::warn!(
                    timeout_ms = self.timeout.as_millis() as u64,
                    "The query took too long to complete"
                );
                Err(DatabaseError::QueryTimeout(self.timeout))
            }
        }
    }
}
