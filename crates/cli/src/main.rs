//! Command-line front end for textorm.
//!
//! Results and errors are written to stdout as JSON; logs go to stderr.

use clap::{Parser, Subcommand};
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use serde::Serialize;
use std::path::Path;
use std::process::ExitCode;
use textorm_core::config::AppConfig;
use textorm_orm::{Orm, OrmError};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const ENV_PREFIX: &str = "TEXTORM_";
const CONFIG_ENV: &str = "TEXTORM_CONFIG";

#[derive(Parser)]
#[command(name = "textorm")]
#[command(about = "Ask questions of a relational database in plain language")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, env = CONFIG_ENV, default_value = "config/textorm.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a question to SQL, optionally running it
    Ask {
        /// Table the query may use (repeatable, order matters)
        #[arg(short, long = "table", value_name = "TABLE", required = true)]
        tables: Vec<String>,

        /// Execute the query and include the rows
        #[arg(long, default_value_t = false)]
        data: bool,

        /// The question to answer
        question: String,
    },
    /// Print the cache fingerprint of a question without touching any store
    Fingerprint {
        /// Table the query may use (repeatable, order matters)
        #[arg(short, long = "table", value_name = "TABLE", required = true)]
        tables: Vec<String>,

        /// The question to fingerprint
        question: String,
    },
    /// Set everything up and ping the cache and relational store
    Check,
}

/// Error payload printed on failure.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    code: &'static str,
    message: String,
    retryable: bool,
}

#[derive(Debug, Serialize)]
struct ErrorEnvelope {
    error: ErrorResponse,
}

impl From<&OrmError> for ErrorEnvelope {
    fn from(err: &OrmError) -> Self {
        Self {
            error: ErrorResponse {
                code: err.code(),
                message: err.to_string(),
                retryable: err.is_retryable(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct CheckResponse {
    status: &'static str,
}

/// Load configuration from an optional TOML file merged with `TEXTORM_*`
/// environment variables (nested keys split on `__`).
fn load_config(path: &str) -> Result<AppConfig, OrmError> {
    let config_path = Path::new(path);
    let mut figment = Figment::new();
    let has_config_file = config_path.exists();

    if has_config_file {
        tracing::info!(config_path = %path, "Loading configuration from file");
        figment = figment.merge(Toml::file(config_path));
    } else {
        tracing::debug!("No config file found at {}", path);
    }

    let has_env_config =
        std::env::vars().any(|(key, _)| key.starts_with(ENV_PREFIX) && key != CONFIG_ENV);
    if !has_config_file && !has_env_config {
        return Err(OrmError::Config(format!(
            "no configuration provided: create {path} or set {ENV_PREFIX}DATABASE__TYPE and related variables"
        )));
    }

    figment
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()
        .map_err(|e| OrmError::Config(format!("failed to load configuration: {e}")))
}

/// Print `value` as pretty JSON on stdout. A rendering failure goes to stderr.
fn print_json<T: Serialize>(value: &T) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(body) => {
            println!("{body}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("failed to render output: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode, OrmError> {
    match cli.command {
        Commands::Ask {
            tables,
            data,
            question,
        } => {
            let config = load_config(&cli.config)?;
            let orm = Orm::setup(&config).await?;
            let result = orm.make_sql_request(&question, &tables, data).await?;
            Ok(print_json(&result))
        }
        Commands::Fingerprint { tables, question } => {
            let fingerprint = Orm::fingerprint(&question, &tables)?;
            println!("{fingerprint}");
            Ok(ExitCode::SUCCESS)
        }
        Commands::Check => {
            let config = load_config(&cli.config)?;
            let orm = Orm::setup(&config).await?;
            orm.health_check().await?;
            Ok(print_json(&CheckResponse { status: "ok" }))
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    textorm_orm::metrics::register_metrics();

    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            tracing::debug!(code = err.code(), "Command failed");
            match serde_json::to_string_pretty(&ErrorEnvelope::from(&err)) {
                Ok(body) => println!("{body}"),
                Err(_) => eprintln!("{err}"),
            }
            ExitCode::FAILURE
        }
    }
}
