//! # ClickUp Time Export
//!
//! Pulls tasks and time entries from the ClickUp v2 API, folds the time entries
//! into per-task, per-assignee billable/non-billable totals and flattens the
//! result into one record per task.
//!
//! ## Quick Start
//!
//! ```no_run
//! use clickup_time_export::{export_team, ExportConfig, TimeWindow};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let window = TimeWindow::new(1735671600000, 1767207600000)?;
//! let config = ExportConfig::new("pk_123", "9001", window).with_concurrency(8);
//!
//! let records = export_team(&config).await?;
//! println!("exported {} tasks", records.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`fetcher`] - HTTP client with retry/backoff, pagination and the [`fetcher::ClickUpApi`] capability
//! - [`exporter`] - Space/folder/list discovery, the bounded list worker pool and the export entry point
//! - [`aggregate`] - Time entry aggregation per task and assignee
//! - [`flatten`] - Task + summary join into [`TaskRecord`]s
//! - [`output`] - CSV and JSON record writers
//! - [`snapshot`] - Versioned on-disk snapshots, the single-flight export lock and the refresh job
//!
//! ## Data Types
//!
//! - [`Space`], [`Folder`], [`WorkList`] - the work hierarchy
//! - [`Task`] - a task annotated with the list/space/folder it was fetched from
//! - [`TimeEntry`] - one tracked duration against a task
//! - [`AssigneeTimeSummary`] - aggregated billable/non-billable time of one assignee

#![warn(missing_docs)]
#![warn(clippy::all)]

use serde::{Deserialize, Serialize};

/// Time entry aggregation
pub mod aggregate;

/// CLI command implementations
pub mod cli;

/// Export orchestration
pub mod exporter;

/// ClickUp API access
pub mod fetcher;

/// Output record construction
pub mod flatten;

/// Observability metrics
pub mod metrics;

/// Record writers
pub mod output;

/// Graceful shutdown coordination
pub mod shutdown;

/// Versioned snapshot persistence
pub mod snapshot;

pub use aggregate::{aggregate_time_entries, TaskTimeSummary};
pub use exporter::{export_team, ExportConfig, ExportError, ExportOptions, Exporter};
pub use flatten::{flatten_tasks, TaskRecord};

/// Milliseconds in one hour
pub const MS_PER_HOUR: f64 = 3_600_000.0;

/// Convert a millisecond duration to hours rounded to 4 decimal places.
///
/// `None` stays `None` so that absent estimates are not reported as zero.
pub fn ms_to_hours(ms: Option<i64>) -> Option<f64> {
    ms.map(|ms| round_hours(ms as f64 / MS_PER_HOUR))
}

fn round_hours(hours: f64) -> f64 {
    (hours * 10_000.0).round() / 10_000.0
}

/// Identifier and display name of a hierarchy node
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    /// Node identifier
    pub id: String,
    /// Display name
    pub name: String,
}

impl EntityRef {
    /// Create a reference from id and name
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Top-level workspace area of a team
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Space {
    /// Space identifier
    pub id: String,
    /// Space name
    pub name: String,
    /// User ids of the space members
    pub member_ids: Vec<String>,
}

impl Space {
    /// Reference to this space
    pub fn entity(&self) -> EntityRef {
        EntityRef::new(&self.id, &self.name)
    }
}

/// Folder grouping lists inside a space
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Folder {
    /// Folder identifier
    pub id: String,
    /// Folder name
    pub name: String,
    /// Owning space
    pub space_id: String,
}

/// A list discovered in the hierarchy, annotated with where it was found.
///
/// Lists are the unit of work of an export run: each one is fetched once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkList {
    /// List identifier
    pub id: String,
    /// List name
    pub name: String,
    /// Owning space
    pub space: EntityRef,
    /// Owning folder, `None` for lists placed directly in a space
    pub folder: Option<EntityRef>,
}

impl WorkList {
    /// Annotate a bare list with its owning space and folder
    pub fn new(list: EntityRef, space: EntityRef, folder: Option<EntityRef>) -> Self {
        Self {
            id: list.id,
            name: list.name,
            space,
            folder,
        }
    }

    /// Source metadata attached to every task fetched from this list
    pub fn source(&self) -> TaskSource {
        TaskSource {
            list_id: self.id.clone(),
            list_name: self.name.clone(),
            space_id: self.space.id.clone(),
            space_name: self.space.name.clone(),
            folder_id: self.folder.as_ref().map(|f| f.id.clone()),
            folder_name: self.folder.as_ref().map(|f| f.name.clone()),
        }
    }
}

/// Where a task was fetched from
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSource {
    /// List identifier
    pub list_id: String,
    /// List name
    pub list_name: String,
    /// Space identifier
    pub space_id: String,
    /// Space name
    pub space_name: String,
    /// Folder identifier
    pub folder_id: Option<String>,
    /// Folder name
    pub folder_name: Option<String>,
}

/// A user assigned to a task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignee {
    /// User identifier
    pub id: String,
    /// Username
    pub username: String,
}

/// ClickUp task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Task identifier
    pub id: String,
    /// Task name
    pub name: String,
    /// Status label (e.g. "in progress")
    pub status: Option<String>,
    /// Assigned users
    pub assignees: Vec<Assignee>,
    /// Due date (Unix timestamp in milliseconds)
    pub due_date_ms: Option<i64>,
    /// Creation date (Unix timestamp in milliseconds)
    pub date_created_ms: Option<i64>,
    /// Time estimate in milliseconds
    pub time_estimate_ms: Option<i64>,
    /// Time spent in milliseconds
    pub time_spent_ms: Option<i64>,
    /// Custom field payload, passed through untouched
    pub custom_fields: serde_json::Value,
    /// List/space/folder the task was fetched from
    pub source: TaskSource,
}

/// Recorded duration of work by one user against one task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeEntry {
    /// Entry identifier
    pub id: Option<String>,
    /// Task the time was tracked against; entries without one are not attributable
    pub task_id: Option<String>,
    /// User identifier
    pub user_id: String,
    /// Username
    pub username: String,
    /// Duration in milliseconds
    pub duration_ms: i64,
    /// Billable flag
    pub billable: bool,
    /// List the entry was queried under
    pub list_id: String,
}

/// Aggregated time of one assignee on one task.
///
/// Hours are derived from the millisecond totals and never accumulated on their own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssigneeTimeSummary {
    /// User identifier
    pub assignee_id: String,
    /// Username
    pub assignee_name: String,
    /// Billable time in milliseconds
    pub billable_ms: i64,
    /// Non-billable time in milliseconds
    pub non_billable_ms: i64,
    /// Billable time in hours (4 decimal places)
    pub billable_hours: f64,
    /// Non-billable time in hours (4 decimal places)
    pub non_billable_hours: f64,
}

impl AssigneeTimeSummary {
    /// Build a summary from accumulated milliseconds
    pub fn from_ms(
        assignee_id: impl Into<String>,
        assignee_name: impl Into<String>,
        billable_ms: i64,
        non_billable_ms: i64,
    ) -> Self {
        Self {
            assignee_id: assignee_id.into(),
            assignee_name: assignee_name.into(),
            billable_ms,
            non_billable_ms,
            billable_hours: ms_to_hours(Some(billable_ms)).unwrap_or_default(),
            non_billable_hours: ms_to_hours(Some(non_billable_ms)).unwrap_or_default(),
        }
    }
}

/// Time range for time entry queries (Unix timestamps in milliseconds)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Inclusive start
    pub start_ms: i64,
    /// Inclusive end
    pub end_ms: i64,
}

impl TimeWindow {
    /// Create a validated window
    pub fn new(start_ms: i64, end_ms: i64) -> Result<Self, String> {
        let window = Self { start_ms, end_ms };
        window.validate()?;
        Ok(window)
    }

    /// Validate window bounds
    pub fn validate(&self) -> Result<(), String> {
        if self.start_ms < 0 {
            return Err(format!(
                "Window start must be non-negative, got {}",
                self.start_ms
            ));
        }

        if self.end_ms < self.start_ms {
            return Err(format!(
                "Window end ({}) must not be before start ({})",
                self.end_ms, self.start_ms
            ));
        }

        Ok(())
    }
}
