//! Snapshot refresh job and read path

use chrono::{NaiveDate, Utc};
use serde_json::{json, Value};
use std::future::Future;
use std::time::Duration;
use tracing::{error, info};

use super::lock::{ExportLock, DEFAULT_LOCK_TTL};
use super::store::FileSnapshotStore;
use super::{version_for, Snapshot, SnapshotError};
use crate::exporter::ExportError;
use crate::TaskRecord;

/// Number of snapshot versions kept per team
pub const KEEP_LAST_N_EXPORTS: usize = 7;

/// Age after which a snapshot version is deleted
pub const MAX_SNAPSHOT_AGE_DAYS: i64 = 30;

/// Result of one refresh attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Another refresh holds the lock
    InProgress,
    /// Today's snapshot already succeeded
    AlreadyFresh {
        /// Version of the existing snapshot
        version: String,
    },
    /// A new snapshot was written
    Refreshed {
        /// Version written
        version: String,
        /// Number of records stored
        records: usize,
        /// Versions deleted afterwards
        pruned: Vec<String>,
    },
}

/// Lock → export → persist → prune
#[derive(Debug, Clone)]
pub struct RefreshJob {
    store: FileSnapshotStore,
    lock_ttl: Duration,
    keep_last: usize,
    max_age_days: i64,
}

impl RefreshJob {
    /// Job over `store` with the default lock TTL and retention
    pub fn new(store: FileSnapshotStore) -> Self {
        Self {
            store,
            lock_ttl: DEFAULT_LOCK_TTL,
            keep_last: KEEP_LAST_N_EXPORTS,
            max_age_days: MAX_SNAPSHOT_AGE_DAYS,
        }
    }

    /// Set the lock TTL
    pub fn with_lock_ttl(mut self, lock_ttl: Duration) -> Self {
        self.lock_ttl = lock_ttl;
        self
    }

    /// Set the retention
    pub fn with_retention(mut self, keep_last: usize, max_age_days: i64) -> Self {
        self.keep_last = keep_last;
        self.max_age_days = max_age_days;
        self
    }

    /// Underlying store
    pub fn store(&self) -> &FileSnapshotStore {
        &self.store
    }

    /// Refresh today's snapshot of `team_id`
    pub async fn run<F, Fut>(&self, team_id: &str, export: F) -> Result<RefreshOutcome, SnapshotError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<TaskRecord>, ExportError>>,
    {
        self.run_on(team_id, Utc::now().date_naive(), export).await
    }

    /// Refresh the snapshot of `team_id` for `today`
    ///
    /// # Errors
    /// An export failure is written to the snapshot as `error`, then returned.
    pub async fn run_on<F, Fut>(
        &self,
        team_id: &str,
        today: NaiveDate,
        export: F,
    ) -> Result<RefreshOutcome, SnapshotError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<TaskRecord>, ExportError>>,
    {
        let version = version_for(today);
        let team_dir = self.store.team_dir(team_id)?;

        let Some(_lock) = ExportLock::try_acquire(&team_dir, self.lock_ttl)? else {
            info!(team_id = team_id, "Refresh already in progress");
            return Ok(RefreshOutcome::InProgress);
        };

        if let Some(existing) = self.store.load(team_id, &version)? {
            if existing.is_success() {
                info!(team_id = team_id, version = %version, "Snapshot already fresh");
                return Ok(RefreshOutcome::AlreadyFresh { version });
            }
        }

        let started = Snapshot::in_progress(Utc::now());
        let started_at = started.started_at;
        self.store.save(team_id, &version, &started)?;

        let records = match export().await {
            Ok(records) => records,
            Err(e) => {
                error!(team_id = team_id, version = %version, status = e.status(), error = %e, "Refresh failed");
                self.store
                    .save(team_id, &version, &Snapshot::failure(&e, started_at, Utc::now()))?;
                return Err(e.into());
            }
        };

        let count = records.len();
        self.store.save(
            team_id,
            &version,
            &Snapshot::success(records, started_at, Utc::now()),
        )?;
        let pruned = self
            .store
            .prune(team_id, self.keep_last, self.max_age_days, today)?;

        info!(
            team_id = team_id,
            version = %version,
            records = count,
            pruned = pruned.len(),
            "Snapshot refreshed"
        );
        Ok(RefreshOutcome::Refreshed {
            version,
            records: count,
            pruned,
        })
    }
}

/// JSON served for the latest snapshot of a team
///
/// - no snapshot: `{"status": "not_ready"}`
/// - successful snapshot: its records
/// - otherwise: the snapshot metadata
pub fn latest_view(store: &FileSnapshotStore, team_id: &str) -> Result<Value, SnapshotError> {
    let view = match store.latest(team_id)? {
        None => json!({"status": "not_ready"}),
        Some((_, snapshot)) if snapshot.is_success() => {
            serde_json::to_value(snapshot.data.unwrap_or_default())
                .map_err(|e| SnapshotError::SerializationError(e.to_string()))?
        }
        Some((_, snapshot)) => serde_json::to_value(snapshot.metadata())
            .map_err(|e| SnapshotError::SerializationError(e.to_string()))?,
    };
    Ok(view)
}
