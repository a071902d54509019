//! The request pipeline.

use crate::error::{OrmError, OrmResult};
use crate::inflight::InflightRequests;
use crate::metrics;
use std::sync::Arc;
use std::time::{Duration, Instant};
use textorm_cache::CacheStore;
use textorm_core::config::AppConfig;
use textorm_core::{CacheEntry, Fingerprint, QueryResult, SqlRequest};
use textorm_database::{QueryExecutor, RelationalStore, SchemaAggregator};
use textorm_generator::GenerationBackend;

/// Tunables for an `Orm` instance.
#[derive(Clone, Debug)]
pub struct OrmOptions {
    /// Namespace prepended to every cache key.
    pub key_prefix: String,
    /// Upper bound on a single query execution.
    pub query_timeout: Duration,
    /// Let only one of several concurrent identical misses generate.
    pub coalesce_misses: bool,
}

impl Default for OrmOptions {
    fn default() -> Self {
        Self {
            key_prefix: textorm_core::DEFAULT_CACHE_KEY_PREFIX.to_string(),
            query_timeout: Duration::from_secs(textorm_core::DEFAULT_QUERY_TIMEOUT_SECS),
            coalesce_misses: true,
        }
    }
}

impl OrmOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            key_prefix: config.cache.key_prefix().to_string(),
            query_timeout: config.database.query_timeout(),
            coalesce_misses: config.orm.coalesce_misses,
        }
    }
}

/// Turns (question, tables) into a validated, cached and optionally executed
/// SQL query.
///
/// Collaborators are injected, so several instances can share or isolate
/// their cache and pool. Cloning is cheap and clones share everything,
/// including in-flight tracking.
#[derive(Clone)]
pub struct Orm {
    cache: Arc<dyn CacheStore>,
    store: Arc<dyn RelationalStore>,
    backend: Arc<dyn GenerationBackend>,
    aggregator: SchemaAggregator,
    executor: QueryExecutor,
    inflight: Arc<InflightRequests>,
    options: OrmOptions,
}

impl Orm {
    /// Assemble an `Orm` from already-constructed parts.
    ///
    /// The backend is used as given; call `setup_backend` if it has not been
    /// set up yet.
    pub fn new(
        cache: Arc<dyn CacheStore>,
        store: Arc<dyn RelationalStore>,
        backend: Arc<dyn GenerationBackend>,
        options: OrmOptions,
    ) -> Self {
        Self {
            aggregator: SchemaAggregator::new(store.clone()),
            executor: QueryExecutor::new(store.clone(), options.query_timeout),
            inflight: Arc::new(InflightRequests::new()),
            cache,
            store,
            backend,
            options,
        }
    }

    /// Connect the cache, open the relational pool and set up the generation
    /// backend, in that order. Fails on the first step that fails.
    pub async fn setup(config: &AppConfig) -> OrmResult<Self> {
        config.validate().map_err(OrmError::Config)?;

        let cache = textorm_cache::from_config(&config.cache).await?;
        tracing::info!(backend = cache.backend_name(), "Cache store initialized");

        let store = textorm_database::from_config(&config.database).await?;
        tracing::info!(backend = store.backend_name(), "Relational store initialized");

        tracing::info!(kind = config.generator.kind(), "Setting up generation backend");
        let backend = textorm_generator::from_config(&config.generator)?;
        backend.setup().await?;
        tracing::info!(backend = backend.name(), "Generation backend initialized");

        Ok(Self::new(cache, store, backend, OrmOptions::from_config(config)))
    }

    /// Run one-time setup on the injected generation backend.
    pub async fn setup_backend(&self) -> OrmResult<()> {
        self.backend.setup().await?;
        tracing::info!(backend = self.backend.name(), "Generation backend initialized");
        Ok(())
    }

    /// The fingerprint a request for `question` over `tables` is cached under.
    pub fn fingerprint<S: AsRef<str>>(question: &str, tables: &[S]) -> OrmResult<Fingerprint> {
        Ok(Fingerprint::derive(question, tables)?)
    }

    /// Full cache key for a fingerprint under this instance's namespace.
    pub fn cache_key(&self, fingerprint: &Fingerprint) -> String {
        textorm_cache::cache_key(&self.options.key_prefix, fingerprint)
    }

    pub fn options(&self) -> &OrmOptions {
        &self.options
    }

    /// Ping the cache, then the relational store.
    pub async fn health_check(&self) -> OrmResult<()> {
        self.cache
            .ping()
            .await
            .map_err(|e| OrmError::CacheUnavailable(e.to_string()))?;
        self.store
            .health_check()
            .await
            .map_err(|e| OrmError::StoreUnavailable(e.to_string()))?;

        let pool = self.store.pool_status();
        tracing::debug!(
            pool_size = pool.size,
            pool_idle = pool.idle,
            pool_in_use = pool.in_use(),
            "Health check passed"
        );
        Ok(())
    }

    /// Resolve a question to SQL, reusing a cached query when one exists, and
    /// run it when `request_data` is set.
    pub async fn make_sql_request<S: AsRef<str>>(
        &self,
        question: &str,
        tables: &[S],
        request_data: bool,
    ) -> OrmResult<QueryResult> {
        metrics::REQUESTS_TOTAL.inc();

        let request = SqlRequest::new(question, tables, request_data);
        request.validate()?;
        tracing::debug!(stage = "received", tables = request.tables.len(), "Request received");

        let fingerprint = request.fingerprint()?;
        tracing::debug!(stage = "fingerprinted", fingerprint = %fingerprint, "Request fingerprinted");

        let key = self.cache_key(&fingerprint);
        let sql = match self.read_cached(&key).await {
            Some(entry) => {
                metrics::CACHE_HITS.inc();
                tracing::debug!(stage = "cache_hit", fingerprint = %fingerprint, "Using cached query");
                entry.sql_query
            }
            None => {
                metrics::CACHE_MISSES.inc();
                tracing::debug!(stage = "cache_miss", fingerprint = %fingerprint, "No cached query");
                self.resolve_miss(&request, fingerprint, &key).await?
            }
        };

        if !request.request_data {
            tracing::debug!(stage = "done", fingerprint = %fingerprint, "Returning query only");
            return Ok(QueryResult::query_only(sql));
        }

        let rows = self.executor.execute(&sql).await.map_err(|e| {
            let err = OrmError::from(e);
            if matches!(err, OrmError::QueryTimeout(_)) {
                metrics::QUERY_TIMEOUTS.inc();
            }
            err
        })?;
        tracing::debug!(
            stage = "executed",
            fingerprint = %fingerprint,
            rows = rows.len(),
            "Query executed"
        );
        Ok(QueryResult::with_data(sql, rows))
    }

    /// Read and decode a cache entry. Read failures and malformed entries
    /// count as misses.
    async fn read_cached(&self, key: &str) -> Option<CacheEntry> {
        let fields = match self.cache.hash_get_all(key).await {
            Ok(Some(fields)) => fields,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Cache read failed, treating as miss");
                return None;
            }
        };
        match CacheEntry::from_fields(&fields) {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Ignoring malformed cache entry");
                None
            }
        }
    }

    async fn resolve_miss(
        &self,
        request: &SqlRequest,
        fingerprint: Fingerprint,
        key: &str,
    ) -> OrmResult<String> {
        if !self.options.coalesce_misses {
            return self.generate_and_store(request, fingerprint, key).await;
        }

        let guard = self.inflight.acquire(fingerprint).await;
        if guard.waited()
            && let Some(entry) = self.read_cached(key).await
        {
            metrics::COALESCED_MISSES.inc();
            tracing::debug!(
                stage = "cache_hit",
                fingerprint = %fingerprint,
                "Using query generated by a concurrent request"
            );
            return Ok(entry.sql_query);
        }
        let sql = self.generate_and_store(request, fingerprint, key).await;
        drop(guard);
        sql
    }

    async fn generate_and_store(
        &self,
        request: &SqlRequest,
        fingerprint: Fingerprint,
        key: &str,
    ) -> OrmResult<String> {
        let schemas = self.aggregator.aggregate(&request.tables).await?;
        tracing::debug!(
            stage = "schema_fetched",
            fingerprint = %fingerprint,
            bytes = schemas.len(),
            "Schemas aggregated"
        );

        let started = Instant::now();
        let candidate = self.backend.generate(&request.question, &schemas).await?;
        let elapsed = started.elapsed();
        metrics::GENERATION_DURATION.observe(elapsed.as_secs_f64());
        tracing::debug!(
            stage = "generated",
            fingerprint = %fingerprint,
            backend = self.backend.name(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Candidate query generated"
        );

        if candidate.trim().is_empty() {
            tracing::warn!(
                fingerprint = %fingerprint,
                backend = self.backend.name(),
                "Backend returned an empty query"
            );
            return Err(OrmError::Generation(
                "backend returned an empty query".to_string(),
            ));
        }

        let validation = textorm_generator::validate(&candidate);
        if !validation.accepted {
            metrics::VALIDATION_REJECTIONS.inc();
            tracing::debug!(
                stage = "rejected",
                fingerprint = %fingerprint,
                reason = %validation.reason,
                "Candidate query rejected"
            );
            return Err(OrmError::SqlGenerator {
                reason: validation.reason,
            });
        }
        tracing::debug!(stage = "validated", fingerprint = %fingerprint, "Candidate query accepted");

        let entry = CacheEntry::new(candidate, schemas);
        match self.cache.hash_set(key, &entry.to_fields()).await {
            Ok(()) => {
                tracing::debug!(stage = "cache_written", fingerprint = %fingerprint, "Query cached");
            }
            Err(e) => {
                metrics::CACHE_WRITE_FAILURES.inc();
                tracing::warn!(
                    fingerprint = %fingerprint,
                    error = %e,
                    "Failed to cache generated query"
                );
            }
        }
        Ok(entry.sql_query)
    }
}
