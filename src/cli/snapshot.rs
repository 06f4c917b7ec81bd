//! `refresh` and `show` commands

use chrono::Utc;
use clap::Args;
use serde_json::json;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};

use super::export::parse_start_time_flexible;
use super::{Cli, CliError};
use crate::exporter::export_team;
use crate::shutdown::SharedShutdown;
use crate::snapshot::lock::DEFAULT_LOCK_TTL;
use crate::snapshot::refresh::{KEEP_LAST_N_EXPORTS, MAX_SNAPSHOT_AGE_DAYS};
use crate::snapshot::{latest_view, FileSnapshotStore, RefreshJob, RefreshOutcome};
use crate::TimeWindow;

/// Arguments of the `refresh` command
#[derive(Args, Debug)]
pub struct RefreshArgs {
    /// Snapshot root directory
    #[arg(long, env = "SNAPSHOT_DIR")]
    pub snapshot_dir: PathBuf,

    /// Window start (YYYY-MM-DD or RFC3339); the window always ends now
    #[arg(long)]
    pub start: String,

    /// Repeat every SECS seconds until Ctrl+C
    #[arg(long, value_name = "SECS")]
    pub every: Option<u64>,

    /// Lock lifetime in seconds
    #[arg(long, default_value_t = DEFAULT_LOCK_TTL.as_secs())]
    pub lock_ttl: u64,

    /// Number of snapshot versions kept
    #[arg(long, default_value_t = KEEP_LAST_N_EXPORTS)]
    pub keep_last: usize,

    /// Snapshot versions older than this many days are deleted
    #[arg(long, default_value_t = MAX_SNAPSHOT_AGE_DAYS)]
    pub max_age_days: i64,
}

impl RefreshArgs {
    /// Refresh once, or on a schedule with `--every`
    pub async fn execute(&self, cli: &Cli, shutdown: SharedShutdown) -> Result<(), CliError> {
        let start = parse_start_time_flexible(&self.start)?;
        let job = RefreshJob::new(FileSnapshotStore::new(&self.snapshot_dir))
            .with_lock_ttl(Duration::from_secs(self.lock_ttl))
            .with_retention(self.keep_last, self.max_age_days);

        loop {
            let window = TimeWindow::new(start, Utc::now().timestamp_millis())
                .map_err(CliError::InvalidArgument)?;
            let config = cli.export_config(window)?;
            config.validate()?;

            match job.run(&config.team_id, || export_team(&config)).await {
                Ok(outcome) => println!("{}", outcome_json(&outcome)),
                Err(e) if self.every.is_some() => {
                    error!(error = %e, "Scheduled refresh failed, retrying on next tick");
                }
                Err(e) => return Err(e.into()),
            }

            let Some(every) = self.every else {
                break;
            };
            if !shutdown.sleep(Duration::from_secs(every)).await {
                info!("Refresh loop stopped");
                break;
            }
        }

        Ok(())
    }
}

/// Arguments of the `show` command
#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Snapshot root directory
    #[arg(long, env = "SNAPSHOT_DIR")]
    pub snapshot_dir: PathBuf,
}

impl ShowArgs {
    /// Print the latest snapshot of the team
    pub fn execute(&self, cli: &Cli) -> Result<(), CliError> {
        let store = FileSnapshotStore::new(&self.snapshot_dir);
        let view = latest_view(&store, cli.team_id()?)?;
        let text = serde_json::to_string_pretty(&view)
            .map_err(|e| CliError::InvalidArgument(format!("Failed to render snapshot: {e}")))?;
        println!("{text}");
        Ok(())
    }
}

fn outcome_json(outcome: &RefreshOutcome) -> serde_json::Value {
    match outcome {
        RefreshOutcome::InProgress => json!({"status": "in_progress"}),
        RefreshOutcome::AlreadyFresh { version } => json!({"status": "success", "version": version}),
        RefreshOutcome::Refreshed {
            version,
            records,
            pruned,
        } => json!({
            "status": "success",
            "version": version,
            "records": records,
            "pruned": pruned,
        }),
    }
}
