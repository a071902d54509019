//! Text-to-SQL request orchestration.
//!
//! This crate provides:
//! - The `Orm` pipeline: fingerprint, cache lookup, schema aggregation,
//!   generation, validation, cache write and bounded execution
//! - The `OrmError` taxonomy with stable codes and retry classification
//! - Coalescing of concurrent identical cache misses
//! - Prometheus metrics for the pipeline

pub mod error;
pub mod inflight;
pub mod metrics;
pub mod orm;

pub use error::{OrmError, OrmResult};
pub use orm::{Orm, OrmOptions};
