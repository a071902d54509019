//! Recording fakes and fixtures for pipeline tests.

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;
use textorm_cache::{CacheError, CacheResult, CacheStore, FieldMap, MemoryCache};
use textorm_core::Row;
use textorm_database::{DatabaseResult, PoolStatus, RelationalStore, SqliteStore};
use textorm_generator::{GenerationBackend, GeneratorError, GeneratorResult};
use textorm_orm::{Orm, OrmOptions};
use tokio::sync::Semaphore;

pub const SETTING_DDL: &str =
    "CREATE TABLE setting (id INTEGER PRIMARY KEY, name TEXT NOT NULL, value TEXT)";
pub const USER_DDL: &str = "CREATE TABLE user (id INTEGER PRIMARY KEY, email TEXT)";

/// Fingerprint of "List of settings Tables: setting".
pub const LIST_SETTINGS_FP: &str =
    "840cb9723ae4b016990e455a8cf917a452240ba5d8807209f0da1007abf7a997";

/// Cache that counts calls and can be told to fail.
#[derive(Default)]
pub struct RecordingCache {
    pub inner: MemoryCache,
    pub reads: AtomicUsize,
    pub writes: AtomicUsize,
    pub fail_reads: AtomicBool,
    pub fail_writes: AtomicBool,
}

impl RecordingCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CacheStore for RecordingCache {
    async fn hash_get_all(&self, key: &str) -> CacheResult<Option<FieldMap>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(CacheError::Unavailable("read refused".to_string()));
        }
        self.inner.hash_get_all(key).await
    }

    async fn hash_set(&self, key: &str, fields: &FieldMap) -> CacheResult<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(CacheError::Unavailable("write refused".to_string()));
        }
        self.inner.hash_set(key, fields).await
    }

    async fn ping(&self) -> CacheResult<()> {
        self.inner.ping().await
    }

    fn backend_name(&self) -> &'static str {
        "recording"
    }
}

/// SQLite store that counts calls and models a single pooled connection.
///
/// Statements containing `pg_sleep` hold the connection for `slow_for`
/// instead of reaching SQLite.
pub struct InstrumentedStore {
    inner: SqliteStore,
    connection: Arc<Semaphore>,
    slow_for: Duration,
    pub schema_lookups: AtomicUsize,
    pub fetches: AtomicUsize,
}

impl InstrumentedStore {
    pub async fn seeded() -> Self {
        let inner = SqliteStore::new(":memory:", 1).await.unwrap();
        sqlx::raw_sql(&format!(
            "{SETTING_DDL};
             {USER_DDL};
             INSERT INTO setting (id, name, value) VALUES (1, 'theme', 'dark');
             INSERT INTO setting (id, name, value) VALUES (2, 'locale', 'en');"
        ))
        .execute(inner.pool())
        .await
        .unwrap();
        Self {
            inner,
            connection: Arc::new(Semaphore::new(1)),
            slow_for: Duration::from_secs(5),
            schema_lookups: AtomicUsize::new(0),
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn schema_lookups(&self) -> usize {
        self.schema_lookups.load(Ordering::SeqCst)
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn available_connections(&self) -> usize {
        self.connection.available_permits()
    }
}

#[async_trait]
impl RelationalStore for InstrumentedStore {
    async fn fetch_schema(&self, table: &str) -> DatabaseResult<Option<String>> {
        self.schema_lookups.fetch_add(1, Ordering::SeqCst);
        self.inner.fetch_schema(table).await
    }

    async fn fetch(&self, sql: &str) -> DatabaseResult<Vec<Row>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let _conn = self.connection.clone().acquire_owned().await.unwrap();
        if sql.contains("pg_sleep") {
            tokio::time::sleep(self.slow_for).await;
            return Ok(Vec::new());
        }
        self.inner.fetch(sql).await
    }

    async fn health_check(&self) -> DatabaseResult<()> {
        self.inner.health_check().await
    }

    fn pool_status(&self) -> PoolStatus {
        PoolStatus {
            size: 1,
            idle: self.connection.available_permits(),
        }
    }

    fn backend_name(&self) -> &'static str {
        "instrumented"
    }
}

/// Backend returning a scripted query and recording what it was asked.
pub struct RecordingBackend {
    response: Mutex<String>,
    delay: Option<Duration>,
    ready: OnceLock<()>,
    calls: AtomicUsize,
    last_schemas: Mutex<Option<String>>,
}

impl RecordingBackend {
    /// A backend that has already been set up.
    pub fn ready(response: &str) -> Self {
        let backend = Self::unready(response);
        let _ = backend.ready.set(());
        backend
    }

    pub fn unready(response: &str) -> Self {
        Self {
            response: Mutex::new(response.to_string()),
            delay: None,
            ready: OnceLock::new(),
            calls: AtomicUsize::new(0),
            last_schemas: Mutex::new(None),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn respond_with(&self, response: &str) {
        *self.response.lock().unwrap() = response.to_string();
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_schemas(&self) -> Option<String> {
        self.last_schemas.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerationBackend for RecordingBackend {
    async fn setup(&self) -> GeneratorResult<()> {
        self.ready
            .set(())
            .map_err(|_| GeneratorError::AlreadyInitialized)
    }

    async fn generate(&self, _question: &str, schemas: &str) -> GeneratorResult<String> {
        if !self.is_ready() {
            return Err(GeneratorError::NotInitialized);
        }
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_schemas.lock().unwrap() = Some(schemas.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.response.lock().unwrap().clone())
    }

    fn is_ready(&self) -> bool {
        self.ready.get().is_some()
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

/// An `Orm` wired to recording fakes, with handles to inspect them.
pub struct Harness {
    pub orm: Orm,
    pub cache: Arc<RecordingCache>,
    pub store: Arc<InstrumentedStore>,
    pub backend: Arc<RecordingBackend>,
}

impl Harness {
    pub async fn new(backend: RecordingBackend) -> Self {
        Self::with_options(backend, OrmOptions::default()).await
    }

    pub async fn with_options(backend: RecordingBackend, options: OrmOptions) -> Self {
        let cache = Arc::new(RecordingCache::new());
        let store = Arc::new(InstrumentedStore::seeded().await);
        let backend = Arc::new(backend);
        let orm = Orm::new(cache.clone(), store.clone(), backend.clone(), options);
        Self {
            orm,
            cache,
            store,
            backend,
        }
    }
}
