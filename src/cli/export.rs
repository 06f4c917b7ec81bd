//! `export` command

use chrono::{DateTime, NaiveDate, Utc};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use super::{Cli, CliError};
use crate::exporter::Exporter;
use crate::fetcher::ClickUpFetcher;
use crate::output::{create_writer, ExportFormat};
use crate::TimeWindow;

/// Arguments of the `export` command
#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Window start (YYYY-MM-DD or RFC3339)
    #[arg(long)]
    pub start: String,

    /// Window end (YYYY-MM-DD or RFC3339, default: now)
    #[arg(long)]
    pub end: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value_t = ExportFormat::Csv)]
    pub format: ExportFormat,

    /// Output file (default: stdout)
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

impl ExportArgs {
    /// Time entry window selected by `--start` and `--end`
    pub fn window(&self) -> Result<TimeWindow, CliError> {
        let start = parse_start_time_flexible(&self.start)?;
        let end = match &self.end {
            Some(end) => parse_end_time_flexible(end)?,
            None => Utc::now().timestamp_millis(),
        };
        TimeWindow::new(start, end).map_err(CliError::InvalidArgument)
    }

    /// Run one export and write its records
    pub async fn execute(&self, cli: &Cli) -> Result<(), CliError> {
        let config = cli.export_config(self.window()?)?;
        config.validate()?;

        let fetcher = ClickUpFetcher::from_config(&config)?;
        let mut exporter = Exporter::new(Arc::new(fetcher), config.options());
        if cli.show_progress() {
            exporter = exporter.with_progress(create_progress_bar());
        }

        let records = exporter.export(&config.team_id).await?;

        let mut writer = create_writer(self.format, self.output.as_deref())?;
        writer.write_records(&records)?;
        writer.finish()?;

        info!(
            records = writer.records_written(),
            format = %self.format,
            output = %self.output.as_ref().map_or("stdout".to_string(), |p| p.display().to_string()),
            "Export written"
        );
        Ok(())
    }
}

/// Progress bar ticking once per fetched list
fn create_progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(0);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} lists {msg}")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}

/// Try to parse datetime from RFC3339 format
///
/// Handles both inputs with and without timezone designators:
/// - "2024-01-01T00:00:00Z" - explicit UTC
/// - "2024-01-01T00:00:00+01:00" - explicit offset
/// - "2024-01-01T00:00:00" - no timezone, assumed UTC
///
/// Returns timestamp in milliseconds, or None if parsing fails.
fn try_parse_datetime_rfc3339(input: &str) -> Option<i64> {
    let input = input.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.timestamp_millis());
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(&format!("{input}Z")) {
        return Some(dt.timestamp_millis());
    }

    None
}

/// Parse a start time from YYYY-MM-DD or RFC3339 datetime format.
///
/// For date-only format, uses start-of-day (00:00:00 UTC).
pub fn parse_start_time_flexible(input: &str) -> Result<i64, CliError> {
    if let Some(ts) = try_parse_datetime_rfc3339(input) {
        return Ok(ts);
    }

    let date = NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
        .map_err(|e| CliError::InvalidArgument(format!("Invalid start time: {e}")))?;
    let datetime = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| CliError::InvalidArgument("Invalid start time".to_string()))?;
    Ok(datetime.and_utc().timestamp_millis())
}

/// Parse an end time from YYYY-MM-DD or RFC3339 datetime format.
///
/// For date-only format, uses end-of-day (23:59:59.999 UTC) so the specified date
/// is fully included.
pub fn parse_end_time_flexible(input: &str) -> Result<i64, CliError> {
    if let Some(ts) = try_parse_datetime_rfc3339(input) {
        return Ok(ts);
    }

    let date = NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
        .map_err(|e| CliError::InvalidArgument(format!("Invalid end time: {e}")))?;
    let datetime = date
        .and_hms_milli_opt(23, 59, 59, 999)
        .ok_or_else(|| CliError::InvalidArgument("Invalid end time".to_string()))?;
    Ok(datetime.and_utc().timestamp_millis())
}
