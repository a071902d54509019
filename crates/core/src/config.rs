//! Configuration types shared across crates.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// A configuration value that must never appear in logs.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    /// Wrap a secret value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Access the raw value.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Whether the secret is empty or whitespace.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("\"<redacted>\"")
    }
}

/// PostgreSQL SSL mode configuration.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PgSslMode {
    /// Disable SSL/TLS entirely.
    Disable,
    /// Prefer SSL/TLS but allow unencrypted connections (default).
    #[default]
    Prefer,
    /// Require SSL/TLS for all connections.
    Require,
}

/// Relational store configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DatabaseConfig {
    /// PostgreSQL database.
    Postgres {
        /// Connection URL (optional if using individual fields).
        /// Takes precedence over individual fields if both are provided.
        url: Option<String>,
        /// Database host (e.g., "localhost" or "db.example.com").
        host: Option<String>,
        /// Database port (default: 5432).
        #[serde(default = "default_pg_port")]
        port: Option<u16>,
        /// Database username.
        username: Option<String>,
        /// Database password.
        /// WARNING: Prefer TEXTORM_DATABASE__PASSWORD over storing it in a file.
        password: Option<Secret>,
        /// Database name.
        database: Option<String>,
        /// SSL mode for connections.
        ssl_mode: Option<PgSslMode>,
        /// Connections kept open while idle.
        #[serde(default = "default_min_connections")]
        min_connections: u32,
        /// Maximum connections in the pool.
        #[serde(default = "default_max_connections")]
        max_connections: u32,
        /// Execution bound in seconds. Also applied as the server-side
        /// statement_timeout on every pooled connection.
        #[serde(default = "default_query_timeout_secs")]
        query_timeout_secs: u64,
    },
    /// SQLite database (local development and tests).
    Sqlite {
        /// Database file path, or ":memory:".
        path: PathBuf,
        /// Maximum connections in the pool.
        #[serde(default = "default_sqlite_max_connections")]
        max_connections: u32,
        /// Execution bound in seconds. Enforced client-side only.
        #[serde(default = "default_query_timeout_secs")]
        query_timeout_secs: u64,
    },
}

fn default_pg_port() -> Option<u16> {
    Some(5432)
}

fn default_min_connections() -> u32 {
    1
}

fn default_max_connections() -> u32 {
    5
}

fn default_sqlite_max_connections() -> u32 {
    1
}

fn default_query_timeout_secs() -> u64 {
    crate::DEFAULT_QUERY_TIMEOUT_SECS
}

impl DatabaseConfig {
    /// The execution bound as a Duration.
    pub fn query_timeout(&self) -> Duration {
        match self {
            Self::Postgres {
                query_timeout_secs, ..
            }
            | Self::Sqlite {
                query_timeout_secs, ..
            } => Duration::from_secs(*query_timeout_secs),
        }
    }

    /// Validate relational store configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Self::Postgres {
                url,
                host,
                database,
                min_connections,
                max_connections,
                query_timeout_secs,
                ..
            } => {
                match (url.as_ref(), host.as_ref(), database.as_ref()) {
                    (Some(_), _, _) | (None, Some(_), Some(_)) => {}
                    (None, None, _) => {
                        return Err(
                            "postgres config requires either 'url' or 'host' + 'database'"
                                .to_string(),
                        );
                    }
                    (None, Some(_), None) => {
                        return Err(
                            "postgres config requires 'database' when using individual fields"
                                .to_string(),
                        );
                    }
                }
                validate_pool(*min_connections, *max_connections)?;
                validate_timeout(*query_timeout_secs)
            }
            Self::Sqlite {
                max_connections,
                query_timeout_secs,
                ..
            } => {
                validate_pool(0, *max_connections)?;
                validate_timeout(*query_timeout_secs)
            }
        }
    }
}

fn validate_pool(min: u32, max: u32) -> Result<(), String> {
    if max == 0 {
        return Err("database.max_connections must be at least 1".to_string());
    }
    if min > max {
        return Err(format!(
            "database.min_connections ({min}) exceeds max_connections ({max})"
        ));
    }
    Ok(())
}

fn validate_timeout(secs: u64) -> Result<(), String> {
    if secs == 0 {
        return Err("database.query_timeout_secs cannot be 0".to_string());
    }
    Ok(())
}

/// Cache store configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CacheConfig {
    /// Redis hashes.
    Redis {
        /// Redis host.
        #[serde(default = "default_redis_host")]
        host: String,
        /// Redis port.
        #[serde(default = "default_redis_port")]
        port: u16,
        /// Logical database index.
        #[serde(default)]
        db: i64,
        /// Optional ACL username.
        username: Option<String>,
        /// Optional password.
        password: Option<Secret>,
        /// Namespace prepended to every key.
        #[serde(default = "default_key_prefix")]
        key_prefix: String,
    },
    /// Process-local map (tests and single-process use only).
    Memory {
        /// Namespace prepended to every key.
        #[serde(default = "default_key_prefix")]
        key_prefix: String,
    },
}

fn default_redis_host() -> String {
    "127.0.0.1".to_string()
}

fn default_redis_port() -> u16 {
    6379
}

fn default_key_prefix() -> String {
    crate::DEFAULT_CACHE_KEY_PREFIX.to_string()
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::Redis {
            host: default_redis_host(),
            port: default_redis_port(),
            db: 0,
            username: None,
            password: None,
            key_prefix: default_key_prefix(),
        }
    }
}

impl CacheConfig {
    /// The configured key namespace.
    pub fn key_prefix(&self) -> &str {
        match self {
            Self::Redis { key_prefix, .. } | Self::Memory { key_prefix } => key_prefix,
        }
    }

    /// Validate cache configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        if self.key_prefix().contains(char::is_whitespace) {
            return Err("cache.key_prefix must not contain whitespace".to_string());
        }
        match self {
            Self::Redis { host, port, .. } => {
                if host.trim().is_empty() {
                    return Err("cache.host cannot be empty".to_string());
                }
                if *port == 0 {
                    return Err("cache.port cannot be 0".to_string());
                }
                Ok(())
            }
            Self::Memory { .. } => Ok(()),
        }
    }
}

/// Generation backend configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GeneratorConfig {
    /// Fine-tuned model served by a local inference server.
    LocalModel {
        /// Base URL of the inference server.
        #[serde(default = "default_local_endpoint")]
        endpoint: String,
        /// Base model name.
        #[serde(default = "default_base_model")]
        base_model: String,
        /// Fine-tuned adapter applied on top of the base model.
        #[serde(default = "default_adapter")]
        adapter: String,
        /// Decoding settings.
        #[serde(default)]
        decoding: DecodingConfig,
    },
    /// Hosted chat-completions API.
    RemoteApi {
        /// API credential.
        api_key: Secret,
        /// API base URL.
        #[serde(default = "default_remote_base_url")]
        base_url: String,
        /// Model name.
        #[serde(default = "default_remote_model")]
        model: String,
        /// Sampling temperature.
        #[serde(default)]
        temperature: f32,
        /// Retries on transport errors, 429 and 5xx responses.
        #[serde(default = "default_max_retries")]
        max_retries: u32,
    },
}

/// Decoding hyperparameters for the local model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DecodingConfig {
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_top_k")]
    pub top_k: u32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    /// Upper bound on generated tokens.
    #[serde(default = "default_max_new_tokens")]
    pub max_new_tokens: u32,
}

fn default_local_endpoint() -> String {
    "http://127.0.0.1:11434".to_string()
}

fn default_base_model() -> String {
    "google/flan-t5-base".to_string()
}

fn default_adapter() -> String {
    "kampkelly/sql-generator".to_string()
}

fn default_temperature() -> f32 {
    0.1
}

fn default_top_k() -> u32 {
    50
}

fn default_top_p() -> f32 {
    0.75
}

fn default_max_new_tokens() -> u32 {
    1000
}

fn default_remote_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_remote_model() -> String {
    "gpt-4o".to_string()
}

fn default_max_retries() -> u32 {
    2
}

/// Upper bound accepted for `generator.max_retries`.
pub const MAX_GENERATOR_RETRIES: u32 = 10;

impl Default for DecodingConfig {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            top_k: default_top_k(),
            top_p: default_top_p(),
            max_new_tokens: default_max_new_tokens(),
        }
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self::LocalModel {
            endpoint: default_local_endpoint(),
            base_model: default_base_model(),
            adapter: default_adapter(),
            decoding: DecodingConfig::default(),
        }
    }
}

impl GeneratorConfig {
    /// A remote API config with default model settings.
    pub fn remote_api(api_key: impl Into<String>) -> Self {
        Self::RemoteApi {
            api_key: Secret::new(api_key),
            base_url: default_remote_base_url(),
            model: default_remote_model(),
            temperature: 0.0,
            max_retries: default_max_retries(),
        }
    }

    /// Short name of the selected backend, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::LocalModel { .. } => "local_model",
            Self::RemoteApi { .. } => "remote_api",
        }
    }

    /// Validate generator configuration invariants.
    ///
    /// An empty API key is not rejected here; it surfaces as a setup failure.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Self::LocalModel {
                endpoint,
                base_model,
                decoding,
                ..
            } => {
                if endpoint.trim().is_empty() {
                    return Err("generator.endpoint cannot be empty".to_string());
                }
                if base_model.trim().is_empty() {
                    return Err("generator.base_model cannot be empty".to_string());
                }
                if !(0.0..=1.0).contains(&decoding.top_p) {
                    return Err(format!(
                        "generator.decoding.top_p {} must be within [0, 1]",
                        decoding.top_p
                    ));
                }
                if decoding.max_new_tokens == 0 {
                    return Err("generator.decoding.max_new_tokens cannot be 0".to_string());
                }
                Ok(())
            }
            Self::RemoteApi {
                base_url,
                model,
                max_retries,
                ..
            } => {
                if base_url.trim().is_empty() {
                    return Err("generator.base_url cannot be empty".to_string());
                }
                if model.trim().is_empty() {
                    return Err("generator.model cannot be empty".to_string());
                }
                if *max_retries > MAX_GENERATOR_RETRIES {
                    return Err(format!(
                        "generator.max_retries {max_retries} exceeds {MAX_GENERATOR_RETRIES}"
                    ));
                }
                Ok(())
            }
        }
    }
}

/// Orchestrator behavior.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OrmConfig {
    /// Serialize concurrent cache misses for the same fingerprint so only one
    /// of them generates (default: true). When false, identical concurrent
    /// misses each generate and the last cache write wins.
    #[serde(default = "default_coalesce_misses")]
    pub coalesce_misses: bool,
}

fn default_coalesce_misses() -> bool {
    true
}

impl Default for OrmConfig {
    fn default() -> Self {
        Self {
            coalesce_misses: default_coalesce_misses(),
        }
    }
}

/// Complete application configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppConfig {
    /// Relational store configuration (required).
    pub database: DatabaseConfig,
    /// Cache store configuration.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Generation backend configuration.
    #[serde(default)]
    pub generator: GeneratorConfig,
    /// Orchestrator options.
    #[serde(default)]
    pub orm: OrmConfig,
}

impl AppConfig {
    /// Create a test configuration with sensible defaults.
    ///
    /// **For testing only.** Uses in-memory SQLite and an in-memory cache.
    pub fn for_testing() -> Self {
        Self {
            database: DatabaseConfig::Sqlite {
                path: PathBuf::from(":memory:"),
                max_connections: default_sqlite_max_connections(),
                query_timeout_secs: default_query_timeout_secs(),
            },
            cache: CacheConfig::Memory {
                key_prefix: default_key_prefix(),
            },
            generator: GeneratorConfig::default(),
            orm: OrmConfig::default(),
        }
    }

    /// Validate every section, reporting the first failure.
    pub fn validate(&self) -> Result<(), String> {
        self.database.validate()?;
        self.cache.validate()?;
        self.generator.validate()
    }
}
