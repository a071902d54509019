//! Generation backend trait.

use crate::error::GeneratorResult;
use async_trait::async_trait;

/// Turns a natural-language question plus a schema blob into candidate SQL.
///
/// Backends are set up exactly once. A second `setup` fails with
/// `AlreadyInitialized`, and `generate` before `setup` fails with
/// `NotInitialized`.
#[async_trait]
pub trait GenerationBackend: Send + Sync + 'static {
    /// Perform one-time initialization (model loading, client construction).
    async fn setup(&self) -> GeneratorResult<()>;

    /// Produce candidate SQL for `question` against `schemas`.
    async fn generate(&self, question: &str, schemas: &str) -> GeneratorResult<String>;

    /// Whether `setup` has completed.
    fn is_ready(&self) -> bool;

    /// Static backend identifier for logs.
    fn name(&self) -> &'static str;
}
