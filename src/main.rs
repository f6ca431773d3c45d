//! HTTP service scaffold.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌──────────────────────────────────────────────────────┐
//!                     │                    SERVICE                           │
//!   Client Request    │  ┌──────────┐   ┌────────────┐   ┌───────────────┐   │
//!   ──────────────────┼─▶│   net    │──▶│   http     │──▶│   routing     │   │
//!                     │  │ listener │   │ middleware │   │ /api/v1 /v2   │   │
//!                     │  └──────────┘   └────────────┘   └───────┬───────┘   │
//!                     │                                          ▼           │
//!   Client Response   │                                  ┌───────────────┐   │
//!   ◀─────────────────┼──────────────────────────────────│   handlers    │   │
//!                     │                                  └───────────────┘   │
//!                     │  ┌────────────────────────────────────────────────┐  │
//!                     │  │  config │ health status │ lifecycle │ logging  │  │
//!                     │  └────────────────────────────────────────────────┘  │
//!                     └──────────────────────────────────────────────────────┘
//! ```
//!
//! Exit status is 0 after a graceful or deadline-forced shutdown and 1 when
//! the service could not start.

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use service_scaffold::config::{self, ConfigError};
use service_scaffold::lifecycle::{self, DrainOutcome, StartupError};
use service_scaffold::observability::{self, LogFormat};
use service_scaffold::StatusReporter;

#[derive(Debug, Parser)]
#[command(name = "service-scaffold", version, about = "Minimal HTTP service scaffold")]
struct Cli {
    /// Definitions file merged into the environment before options are read.
    /// Defaults to `.env` when present.
    #[arg(long, value_name = "PATH")]
    env_file: Option<PathBuf>,

    /// Log output format.
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let status = StatusReporter::new();

    // Loaded before logging so RUST_LOG may come from the file.
    let env_file = config::load_dotenv(cli.env_file.as_deref());
    observability::init(cli.log_format);

    tracing::info!("service-scaffold v{} starting", env!("CARGO_PKG_VERSION"));

    match run(env_file, status).await {
        Ok(outcome) => {
            tracing::info!(outcome = ?outcome, "shutting down");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Fatal error");
            ExitCode::FAILURE
        }
    }
}

async fn run(
    env_file: Result<Option<PathBuf>, ConfigError>,
    status: StatusReporter,
) -> Result<DrainOutcome, Box<dyn std::error::Error>> {
    match env_file.map_err(StartupError::from)? {
        Some(path) => tracing::info!(path = %path.display(), "Loaded env file"),
        None => tracing::debug!("No env file found"),
    }

    let config = Arc::new(config::from_env().map_err(StartupError::from)?);
    let server = lifecycle::launch(config, status).await?;

    Ok(server.run_until_shutdown().await?)
}
