//! Query executor timeout and error-mapping tests.

mod common;

use common::{SchemaOutcome, ScriptedSchemaStore, SlowStore};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;
use textorm_database::{DatabaseError, QueryExecutor};

#[tokio::test(start_paused = true)]
async fn test_timeout_returns_connection_to_pool() {
    let store = Arc::new(SlowStore::new(Duration::from_secs(10)));
    let executor = QueryExecutor::new(store.clone(), Duration::from_secs(1));

    let started = tokio::time::Instant::now();
    let err = executor.execute("SELECT pg_sleep(10)").await.unwrap_err();
    assert!(matches!(err, DatabaseError::QueryTimeout(d) if d == Duration::from_secs(1)));
    assert!(started.elapsed() < Duration::from_secs(2));

    // The abandoned statement must not keep its connection checked out.
    assert_eq!(store.available_connections(), 1);

    let rows = executor.execute("SELECT 1 AS one").await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(store.fetches.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_fast_query_within_bound() {
    let store = Arc::new(SlowStore::new(Duration::from_secs(10)));
    let executor = QueryExecutor::new(store, Duration::from_secs(1));

    let rows = executor.execute("SELECT 1 AS one").await.unwrap();
    assert_eq!(rows[0]["one"], 1);
    assert_eq!(executor.timeout(), Duration::from_secs(1));
}

#[tokio::test]
async fn test_store_failure_maps_to_execution() {
    let store = Arc::new(ScriptedSchemaStore::new([(
        "setting",
        SchemaOutcome::Found("CREATE TABLE setting (id INTEGER)".to_string()),
    )]));
    let executor = QueryExecutor::new(store, Duration::from_secs(5));

    match executor.execute("SELECT * FROM nowhere").await {
        Err(DatabaseError::Execution(message)) => assert!(message.contains("nowhere")),
        other => panic!("expected execution error, got {other:?}"),
    }
}
