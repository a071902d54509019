//! Prometheus metrics for the request pipeline.
//!
//! Metrics live in a crate-local registry. Embedders call
//! `register_metrics()` once at startup and expose `gather_metrics()` however
//! they see fit.

use prometheus::{self, Encoder, Histogram, HistogramOpts, IntCounter, Registry, TextEncoder};
use std::sync::{LazyLock, Once};

/// Global Prometheus registry for all metrics.
pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

pub static REQUESTS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new("textorm_requests_total", "Total number of SQL requests received")
        .expect("metric creation failed")
});

// Cache metrics
pub static CACHE_HITS: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "textorm_cache_hits_total",
        "Requests answered from a cached query",
    )
    .expect("metric creation failed")
});

pub static CACHE_MISSES: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "textorm_cache_misses_total",
        "Requests that found no usable cached query",
    )
    .expect("metric creation failed")
});

pub static CACHE_WRITE_FAILURES: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "textorm_cache_write_failures_total",
        "Accepted queries that could not be written to the cache",
    )
    .expect("metric creation failed")
});

pub static COALESCED_MISSES: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "textorm_coalesced_misses_total",
        "Misses answered by a concurrent request's generation",
    )
    .expect("metric creation failed")
});

// Generation metrics
pub static VALIDATION_REJECTIONS: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "textorm_validation_rejections_total",
        "Generated queries rejected by the validator",
    )
    .expect("metric creation failed")
});

pub static GENERATION_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "textorm_generation_duration_seconds",
            "Time taken by the generation backend to produce a query",
        )
        .buckets(vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
    )
    .expect("metric creation failed")
});

// Execution metrics
pub static QUERY_TIMEOUTS: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "textorm_query_timeouts_total",
        "Query executions that exceeded their time bound",
    )
    .expect("metric creation failed")
});

static REGISTER_ONCE: Once = Once::new();

/// Register all metrics with the global registry. Safe to call repeatedly.
pub fn register_metrics() {
    REGISTER_ONCE.call_once(|| {
        REGISTRY
            .register(Box::new(REQUESTS_TOTAL.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(CACHE_HITS.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(CACHE_MISSES.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(CACHE_WRITE_FAILURES.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(COALESCED_MISSES.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(VALIDATION_REJECTIONS.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(GENERATION_DURATION.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(QUERY_TIMEOUTS.clone()))
            .expect("metric registration failed");
    });
}

/// Render all registered metrics in the Prometheus text format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::warn!(error = %e, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8_lossy(&buffer).into_owned()
}
