//! CLI command implementations
//!
//! `clickup-time-export` has three commands:
//! - `export` - run one export and write the records as CSV or JSON
//! - `refresh` - refresh today's on-disk snapshot, optionally on a schedule
//! - `show` - print the latest snapshot

use clap::{Parser, Subcommand};
use std::io::IsTerminal;
use std::net::SocketAddr;
use std::time::Duration;

use crate::exporter::config::{
    ExportConfig, CLICKUP_API_BASE, DEFAULT_CONCURRENCY, HTTP_REQUEST_TIMEOUT_SECS,
};
use crate::TimeWindow;

pub mod error;
pub mod export;
pub mod snapshot;

pub use error::CliError;
pub use export::ExportArgs;
pub use snapshot::{RefreshArgs, ShowArgs};

/// Maximum allowed concurrency to prevent self-inflicted rate limiting
const MAX_CONCURRENCY: usize = 32;

/// ClickUp time export CLI
#[derive(Parser, Debug)]
#[command(name = "clickup-time-export", version, about, long_about = None)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// ClickUp API token
    #[arg(long, global = true, env = "CLICKUP_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// ClickUp team (workspace) id
    #[arg(long, global = true, env = "CLICKUP_TEAM_ID")]
    pub team_id: Option<String>,

    /// API base URL
    #[arg(long, global = true, env = "CLICKUP_API_BASE", default_value = CLICKUP_API_BASE)]
    pub base_url: String,

    /// Number of lists fetched concurrently (default: 5, max: 32)
    #[arg(long, global = true, env = "CONCURRENCY", default_value_t = DEFAULT_CONCURRENCY, value_parser = parse_concurrency)]
    pub concurrency: usize,

    /// Attempts per request, initial attempt included (default: 5, range: 1-20)
    #[arg(long, global = true, env = "MAX_RETRIES", default_value = "5", value_parser = clap::value_parser!(u32).range(1..=20))]
    pub max_retries: u32,

    /// Delay before the first retry in seconds, doubled after every retry
    #[arg(long, global = true, env = "INITIAL_BACKOFF", default_value = "1.0", value_parser = parse_seconds)]
    pub initial_backoff: Duration,

    /// Per-attempt HTTP timeout in seconds
    #[arg(long, global = true, default_value_t = HTTP_REQUEST_TIMEOUT_SECS)]
    pub request_timeout: u64,

    /// Client-side request budget per minute (off by default)
    #[arg(long, global = true)]
    pub rate_limit_per_minute: Option<usize>,

    /// Serve Prometheus metrics on this address (e.g. 0.0.0.0:9090)
    #[arg(long, global = true)]
    pub metrics_addr: Option<SocketAddr>,

    /// Disable the progress bar
    #[arg(long, global = true, default_value_t = false)]
    pub no_progress: bool,
}

/// CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Export tasks with their time summaries
    Export(ExportArgs),

    /// Refresh today's snapshot
    Refresh(RefreshArgs),

    /// Print the latest snapshot
    Show(ShowArgs),
}

impl Cli {
    /// Team id, required by every command
    pub fn team_id(&self) -> Result<&str, CliError> {
        self.team_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| {
                CliError::ConfigurationError(
                    "Please set CLICKUP_TOKEN and CLICKUP_TEAM_ID (or pass --team-id).".to_string(),
                )
            })
    }

    /// Export configuration for `window`
    pub fn export_config(&self, window: TimeWindow) -> Result<ExportConfig, CliError> {
        let token = self.token.clone().ok_or_else(|| {
            CliError::ConfigurationError(
                "Please set CLICKUP_TOKEN and CLICKUP_TEAM_ID (or pass --token).".to_string(),
            )
        })?;

        Ok(ExportConfig::new(token, self.team_id()?, window)
            .with_base_url(&self.base_url)
            .with_concurrency(self.concurrency)
            .with_max_retries(self.max_retries)
            .with_initial_backoff(self.initial_backoff)
            .with_request_timeout(Duration::from_secs(self.request_timeout))
            .with_rate_limit_per_minute(self.rate_limit_per_minute))
    }

    /// Whether to draw a progress bar
    pub fn show_progress(&self) -> bool {
        !self.no_progress && std::io::stderr().is_terminal()
    }
}

/// Parse and validate concurrency value
fn parse_concurrency(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;

    if value == 0 {
        return Err("concurrency must be at least 1".to_string());
    }
    if value > MAX_CONCURRENCY {
        return Err(format!(
            "concurrency {value} exceeds maximum of {MAX_CONCURRENCY}"
        ));
    }
    Ok(value)
}

/// Parse a non-negative, possibly fractional number of seconds
fn parse_seconds(s: &str) -> Result<Duration, String> {
    let secs: f64 = s
        .trim()
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number of seconds"))?;
    if !secs.is_finite() || secs < 0.0 {
        return Err(format!("'{s}' must be a non-negative number of seconds"));
    }
    Ok(Duration::from_secs_f64(secs))
}
