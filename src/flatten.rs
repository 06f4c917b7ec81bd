//! Output record construction
//!
//! Joins every task with its time summary and source metadata into one flat
//! [`TaskRecord`]. Tasks are neither filtered nor deduplicated: a task fetched
//! from two lists yields two records.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::aggregate::TaskTimeSummary;
use crate::{ms_to_hours, AssigneeTimeSummary, Task};

/// One exported task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    /// Task identifier
    pub task_id: String,
    /// Task name
    pub task_name: String,
    /// Status label
    pub status: Option<String>,
    /// Assignee usernames joined with ", "
    pub assignees: String,
    /// Due date (RFC 3339, UTC)
    pub due_date: Option<String>,
    /// Creation date (RFC 3339, UTC)
    pub date_created: Option<String>,
    /// Time estimate in milliseconds
    pub time_estimate_ms: Option<i64>,
    /// Time estimate in hours
    pub time_estimate_hours: Option<f64>,
    /// Time spent in milliseconds
    pub time_spent_ms: Option<i64>,
    /// Time spent in hours
    pub time_spent_hours: Option<f64>,
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
    /// Custom field payload
    pub custom_fields: serde_json::Value,
    /// Tracked time per assignee, empty when nothing was tracked
    pub time_summary: Vec<AssigneeTimeSummary>,
}

impl TaskRecord {
    /// Build the record of `task` with its assignee summaries
    pub fn from_task(task: Task, time_summary: Vec<AssigneeTimeSummary>) -> Self {
        let assignees = task
            .assignees
            .iter()
            .map(|a| a.username.as_str())
            .collect::<Vec<_>>()
            .join(", ");

        Self {
            task_id: task.id,
            task_name: task.name,
            status: task.status,
            assignees,
            due_date: format_timestamp(task.due_date_ms),
            date_created: format_timestamp(task.date_created_ms),
            time_estimate_ms: task.time_estimate_ms,
            time_estimate_hours: ms_to_hours(task.time_estimate_ms),
            time_spent_ms: task.time_spent_ms,
            time_spent_hours: ms_to_hours(task.time_spent_ms),
            list_id: task.source.list_id,
            list_name: task.source.list_name,
            space_id: task.source.space_id,
            space_name: task.source.space_name,
            folder_id: task.source.folder_id,
            folder_name: task.source.folder_name,
            custom_fields: task.custom_fields,
            time_summary,
        }
    }

    /// Billable milliseconds over all assignees
    pub fn billable_ms(&self) -> i64 {
        self.time_summary.iter().map(|s| s.billable_ms).sum()
    }

    /// Non-billable milliseconds over all assignees
    pub fn non_billable_ms(&self) -> i64 {
        self.time_summary.iter().map(|s| s.non_billable_ms).sum()
    }
}

/// One record per task, in task order
pub fn flatten_tasks(tasks: Vec<Task>, summary: &TaskTimeSummary) -> Vec<TaskRecord> {
    tasks
        .into_iter()
        .map(|task| {
            let time_summary = summary.get(&task.id).map(<[_]>::to_vec).unwrap_or_default();
            TaskRecord::from_task(task, time_summary)
        })
        .collect()
}

/// Render a Unix millisecond timestamp as RFC 3339
pub fn format_timestamp(ms: Option<i64>) -> Option<String> {
    DateTime::<Utc>::from_timestamp_millis(ms?)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
}
