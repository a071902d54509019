//! Generation backend error types.

use thiserror::Error;

/// Generation backend errors.
#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("backend setup failed: {0}")]
    Setup(String),

    #[error("backend setup failed: already initialized")]
    AlreadyInitialized,

    #[error("generation failed: backend has not been set up")]
    NotInitialized,

    #[error("generation failed: {0}")]
    Generation(String),

    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type for generation backend operations.
pub type GeneratorResult<T> = std::result::Result<T, GeneratorError>;
