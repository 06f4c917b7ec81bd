//! Export orchestration
//!
//! One export run walks the work hierarchy and fans the lists out to a
//! bounded worker pool. It then aggregates the time entries and flattens
//! every task into a [`TaskRecord`]:
//!
//! 1. **Discovery**: [`discovery::TreeDiscoverer`] finds every list once
//! 2. **Fetching**: [`pool::ListWorkerPool`] fetches tasks and time entries per list
//! 3. **Aggregation**: [`crate::aggregate_time_entries`] sums tracked time
//! 4. **Flattening**: [`crate::flatten_tasks`] builds the output records
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use clickup_time_export::fetcher::ClickUpFetcher;
//! use clickup_time_export::{ExportConfig, Exporter, TimeWindow};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let window = TimeWindow::new(1735671600000, 1767207600000)?;
//! let config = ExportConfig::new("pk_123", "9001", window);
//! config.validate()?;
//!
//! let api = Arc::new(ClickUpFetcher::from_config(&config)?);
//! let records = Exporter::new(api, config.options()).export(&config.team_id).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Error Handling
//!
//! Every failure is an [`ExportError`] carrying an HTTP-style status:
//! - remote failures keep the status of the underlying [`FetcherError`]
//! - configuration errors map to 400 and are raised before any request

pub mod config;
pub mod discovery;
pub mod pool;
pub mod rate_limit;

pub use config::{ExportConfig, ExportOptions};
pub use discovery::{Discovery, TreeDiscoverer};
pub use pool::{ListHarvest, ListWorkerPool};
pub use rate_limit::{RateLimitError, RateLimiter};

use indicatif::ProgressBar;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{info, Instrument};

use crate::aggregate::aggregate_time_entries;
use crate::fetcher::{ClickUpApi, ClickUpFetcher, FetcherError};
use crate::flatten::{flatten_tasks, TaskRecord};
use crate::metrics::{generate_correlation_id, ExportMetrics};

/// Export errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExportError {
    /// Remote API failure
    #[error(transparent)]
    RemoteApi(#[from] FetcherError),

    /// Invalid or missing configuration
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl ExportError {
    /// HTTP-style status of the failure
    pub fn status(&self) -> u16 {
        match self {
            Self::RemoteApi(e) => e.status(),
            Self::Configuration(_) => 400,
        }
    }
}

/// Export pipeline over a [`ClickUpApi`]
pub struct Exporter {
    api: Arc<dyn ClickUpApi>,
    options: ExportOptions,
    semaphore: Option<Arc<Semaphore>>,
    progress: Option<ProgressBar>,
}

impl Exporter {
    /// Create an exporter
    pub fn new(api: Arc<dyn ClickUpApi>, options: ExportOptions) -> Self {
        Self {
            api,
            options,
            semaphore: None,
            progress: None,
        }
    }

    /// Share the list worker semaphore with other exporters
    pub fn with_semaphore(mut self, semaphore: Arc<Semaphore>) -> Self {
        self.semaphore = Some(semaphore);
        self
    }

    /// Report list progress on `progress`
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Pipeline settings
    pub fn options(&self) -> &ExportOptions {
        &self.options
    }

    /// Export every task of a team
    ///
    /// # Errors
    /// The first failing request fails the run; no partial result is returned.
    pub async fn export(&self, team_id: &str) -> Result<Vec<TaskRecord>, ExportError> {
        let correlation_id = generate_correlation_id();
        let span = tracing::info_span!(
            "export",
            team_id = %team_id,
            correlation_id = %correlation_id,
            start_ms = self.options.window.start_ms,
            end_ms = self.options.window.end_ms
        );

        let metrics = ExportMetrics::start(team_id);
        match self.run(team_id, &metrics).instrument(span).await {
            Ok((lists, records)) => {
                metrics.record_success(lists, records.len());
                Ok(records)
            }
            Err(e) => {
                metrics.record_failure(e.status(), &e.to_string());
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        team_id: &str,
        metrics: &ExportMetrics,
    ) -> Result<(usize, Vec<TaskRecord>), ExportError> {
        let discovery = TreeDiscoverer::new(self.api.clone()).discover(team_id).await?;
        let list_count = discovery.lists.len();

        let mut pool = ListWorkerPool::new(self.api.clone(), self.options.concurrency)
            .with_page_size(self.options.page_size);
        if let Some(semaphore) = &self.semaphore {
            pool = pool.with_semaphore(semaphore.clone());
        }
        if let Some(progress) = &self.progress {
            pool = pool.with_progress(progress.clone());
        }

        let harvests = pool
            .run(
                discovery.lists,
                team_id,
                &discovery.member_ids,
                &self.options.window,
            )
            .await?;

        let mut tasks = Vec::new();
        let mut time_entries = Vec::new();
        for harvest in harvests {
            metrics.record_list();
            tasks.extend(harvest.tasks);
            time_entries.extend(harvest.time_entries);
        }

        let summary = aggregate_time_entries(&time_entries);
        info!(
            tasks = tasks.len(),
            time_entries = time_entries.len(),
            tasks_with_time = summary.len(),
            "Aggregated time entries"
        );

        Ok((list_count, flatten_tasks(tasks, &summary)))
    }
}

/// Validate `config`, build the HTTP fetcher and export its team
///
/// # Errors
/// `Configuration` before any request when the config is invalid, otherwise
/// the first remote failure.
pub async fn export_team(config: &ExportConfig) -> Result<Vec<TaskRecord>, ExportError> {
    config.validate()?;
    let fetcher = ClickUpFetcher::from_config(config)?;
    Exporter::new(Arc::new(fetcher), config.options())
        .export(&config.team_id)
        .await
}
