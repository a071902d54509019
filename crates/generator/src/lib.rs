//! SQL generation for textorm.
//!
//! This crate provides:
//! - The `GenerationBackend` contract
//! - A local inference server backend and a hosted chat-completions backend
//! - Prompt rendering and few-shot demonstrations
//! - Keyword screening of candidate queries

pub mod backend;
pub mod error;
pub mod local;
pub mod prompt;
pub mod remote;
pub mod validator;

pub use backend::GenerationBackend;
pub use error::{GeneratorError, GeneratorResult};
pub use local::LocalModelBackend;
pub use remote::RemoteApiBackend;
pub use validator::{Validation, validate};

use std::sync::Arc;
use textorm_core::config::GeneratorConfig;

/// Create a generation backend from configuration. The backend is returned
/// un-initialized; call `setup` before generating.
pub fn from_config(config: &GeneratorConfig) -> GeneratorResult<Arc<dyn GenerationBackend>> {
    config.validate().map_err(GeneratorError::Config)?;

    let backend: Arc<dyn GenerationBackend> = match config {
        GeneratorConfig::LocalModel {
            endpoint,
            base_model,
            adapter,
            decoding,
        } => Arc::new(LocalModelBackend::new(
            endpoint,
            base_model.clone(),
            adapter.clone(),
            decoding.clone(),
        )),
        GeneratorConfig::RemoteApi {
            api_key,
            base_url,
            model,
            temperature,
            max_retries,
        } => Arc::new(RemoteApiBackend::new(
            api_key.clone(),
            base_url,
            model.clone(),
            *temperature,
            *max_retries,
        )),
    };
    tracing::debug!(backend = backend.name(), "Generation backend selected");
    Ok(backend)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_selects_backend() {
        let local = from_config(&GeneratorConfig::default()).unwrap();
        assert_eq!(local.name(), "local_model");
        assert!(!local.is_ready());

        let remote = from_config(&GeneratorConfig::remote_api("sk-test")).unwrap();
        assert_eq!(remote.name(), "remote_api");
    }

    #[test]
    fn test_from_config_rejects_invalid() {
        let config = GeneratorConfig::LocalModel {
            endpoint: " ".to_string(),
            base_model: "google/flan-t5-base".to_string(),
            adapter: "kampkelly/sql-generator".to_string(),
            decoding: Default::default(),
        };
        match from_config(&config) {
            Err(GeneratorError::Config(_)) => {}
            Err(other) => panic!("unexpected error: {other:?}"),
            Ok(_) => panic!("expected error"),
        }
    }
}
