//! Versioned snapshot persistence
//!
//! Export results are cached on disk, one version per day and team:
//!
//! ```text
//! <root>/<team_id>/20250101.json
//! <root>/<team_id>/20250102.json
//! <root>/<team_id>/export.lock
//! ```
//!
//! - [`store::FileSnapshotStore`] - atomic reads/writes, latest version, pruning
//! - [`lock::ExportLock`] - add-if-absent lock with a TTL, one refresh per team at a time
//! - [`refresh::RefreshJob`] - lock → export → persist → prune

pub mod lock;
pub mod refresh;
pub mod store;

pub use lock::ExportLock;
pub use refresh::{latest_view, RefreshJob, RefreshOutcome};
pub use store::FileSnapshotStore;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::exporter::ExportError;
use crate::TaskRecord;

/// Format of a snapshot version
pub const VERSION_FORMAT: &str = "%Y%m%d";

/// Version key of `date`
pub fn version_for(date: NaiveDate) -> String {
    date.format(VERSION_FORMAT).to_string()
}

/// Date of a version key, `None` when the key is not a version
pub fn parse_version(version: &str) -> Option<NaiveDate> {
    if version.len() != 8 || !version.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    NaiveDate::parse_from_str(version, VERSION_FORMAT).ok()
}

/// Lifecycle state of a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotStatus {
    /// An export is running
    InProgress,
    /// The export finished and `data` holds its records
    Success,
    /// The export failed
    Error,
}

/// Stored export result or progress marker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Lifecycle state
    pub status: SnapshotStatus,
    /// When the export started
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    /// When the snapshot last changed state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Failure message of an `error` snapshot
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// HTTP-style status of an `error` snapshot
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    /// Exported records of a `success` snapshot
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<TaskRecord>>,
}

impl Snapshot {
    /// Marker written when an export starts
    pub fn in_progress(now: DateTime<Utc>) -> Self {
        Self {
            status: SnapshotStatus::InProgress,
            started_at: Some(now),
            updated_at: None,
            error: None,
            status_code: None,
            data: None,
        }
    }

    /// Result of a successful export
    pub fn success(records: Vec<TaskRecord>, started_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Self {
        Self {
            status: SnapshotStatus::Success,
            started_at,
            updated_at: Some(now),
            error: None,
            status_code: None,
            data: Some(records),
        }
    }

    /// Result of a failed export
    pub fn failure(error: &ExportError, started_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Self {
        Self {
            status: SnapshotStatus::Error,
            started_at,
            updated_at: Some(now),
            error: Some(error.to_string()),
            status_code: Some(error.status()),
            data: None,
        }
    }

    /// Whether this snapshot holds a complete export
    pub fn is_success(&self) -> bool {
        self.status == SnapshotStatus::Success
    }

    /// This snapshot without its records
    pub fn metadata(&self) -> Self {
        Self {
            data: None,
            ..self.clone()
        }
    }
}

/// Snapshot errors
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// IO error
    #[error("IO error: {0}")]
    IoError(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// Deserialization error
    #[error("deserialization error: {0}")]
    DeserializationError(String),

    /// Lock error
    #[error("lock error: {0}")]
    LockError(String),

    /// Team id that cannot name a directory
    #[error("invalid team id '{0}'")]
    InvalidTeamId(String),

    /// The export run failed
    #[error(transparent)]
    Export(#[from] ExportError),
}
