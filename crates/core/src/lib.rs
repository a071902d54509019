//! Core domain types and shared logic for textorm.
//!
//! This crate defines the data model used across all other crates:
//! - Question and table-list normalization
//! - Fingerprint derivation (the cache key)
//! - Cache entries and query results
//! - Configuration for every collaborator

pub mod config;
pub mod error;
pub mod fingerprint;
pub mod models;
pub mod request;

pub use error::{Error, Result};
pub use fingerprint::Fingerprint;
pub use models::{CacheEntry, QueryResult, Row, insert_column};
pub use request::SqlRequest;

/// Default bound on query execution time, in seconds.
pub const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 30;

/// Default namespace prepended to every cache key.
pub const DEFAULT_CACHE_KEY_PREFIX: &str = "orm";
