//! Shared fakes for relational store tests.

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use textorm_core::Row;
use textorm_database::{DatabaseError, DatabaseResult, PoolStatus, RelationalStore};
use tokio::sync::Semaphore;

/// Single-connection store whose "pool" is a one-permit semaphore.
///
/// Statements containing `pg_sleep` hold the connection for `slow_for`;
/// everything else returns one row immediately.
pub struct SlowStore {
    pool: Arc<Semaphore>,
    slow_for: Duration,
    pub fetches: AtomicUsize,
}

impl SlowStore {
    pub fn new(slow_for: Duration) -> Self {
        Self {
            pool: Arc::new(Semaphore::new(1)),
            slow_for,
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn available_connections(&self) -> usize {
        self.pool.available_permits()
    }
}

#[async_trait]
impl RelationalStore for SlowStore {
    async fn fetch_schema(&self, _table: &str) -> DatabaseResult<Option<String>> {
        Ok(None)
    }

    async fn fetch(&self, sql: &str) -> DatabaseResult<Vec<Row>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let _conn = self
            .pool
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| DatabaseError::Execution(e.to_string()))?;
        if sql.contains("pg_sleep") {
            tokio::time::sleep(self.slow_for).await;
        }
        let mut row = Row::new();
        row.insert("one".to_string(), json!(1));
        Ok(vec![row])
    }

    async fn health_check(&self) -> DatabaseResult<()> {
        Ok(())
    }

    fn pool_status(&self) -> PoolStatus {
        PoolStatus {
            size: 1,
            idle: self.pool.available_permits(),
        }
    }

    fn backend_name(&self) -> &'static str {
        "slow"
    }
}

/// Outcome a `ScriptedSchemaStore` returns for one table.
#[derive(Clone)]
pub enum SchemaOutcome {
    Found(String),
    Missing,
    Fail(String),
}

/// Store answering schema lookups from a fixed table.
pub struct ScriptedSchemaStore {
    outcomes: HashMap<String, SchemaOutcome>,
    pub lookups: std::sync::Mutex<Vec<String>>,
}

impl ScriptedSchemaStore {
    pub fn new(outcomes: impl IntoIterator<Item = (&'static str, SchemaOutcome)>) -> Self {
        Self {
            outcomes: outcomes
                .into_iter()
                .map(|(table, outcome)| (table.to_string(), outcome))
                .collect(),
            lookups: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn lookups(&self) -> Vec<String> {
        self.lookups.lock().unwrap().clone()
    }
}

#[async_trait]
impl RelationalStore for ScriptedSchemaStore {
    async fn fetch_schema(&self, table: &str) -> DatabaseResult<Option<String>> {
        self.lookups.lock().unwrap().push(table.to_string());
        match self.outcomes.get(table) {
            Some(SchemaOutcome::Found(sql)) => Ok(Some(sql.clone())),
            Some(SchemaOutcome::Fail(message)) => Err(DatabaseError::Execution(message.clone())),
            Some(SchemaOutcome::Missing) | None => Ok(None),
        }
    }

    async fn fetch(&self, _sql: &str) -> DatabaseResult<Vec<Row>> {
        Err(DatabaseError::Execution("no such table: nowhere".to_string()))
    }

    async fn health_check(&self) -> DatabaseResult<()> {
        Ok(())
    }

    fn pool_status(&self) -> PoolStatus {
        PoolStatus { size: 0, idle: 0 }
    }

    fn backend_name(&self) -> &'static str {
        "scripted"
    }
}
