//! Time entry aggregation
//!
//! Folds time entries into per-task, per-assignee totals with a
//! billable/non-billable split. Milliseconds are summed exactly; hours are
//! derived once from the totals.

use std::collections::HashMap;

use crate::{AssigneeTimeSummary, TimeEntry};

/// Per-task assignee summaries, in first-encounter order of tasks and assignees
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskTimeSummary {
    order: Vec<String>,
    by_task: HashMap<String, Vec<AssigneeTimeSummary>>,
}

impl TaskTimeSummary {
    /// Summaries of `task_id`, `None` when no entry was tracked against it
    pub fn get(&self, task_id: &str) -> Option<&[AssigneeTimeSummary]> {
        self.by_task.get(task_id).map(Vec::as_slice)
    }

    /// Number of tasks with at least one entry
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether no task has an entry
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Task ids with their summaries, in first-encounter order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[AssigneeTimeSummary])> + '_ {
        self.order
            .iter()
            .filter_map(|id| self.by_task.get(id).map(|s| (id.as_str(), s.as_slice())))
    }
}

#[derive(Default)]
struct TaskBucket {
    index: HashMap<String, usize>,
    users: Vec<UserBucket>,
}

struct UserBucket {
    user_id: String,
    username: String,
    billable_ms: i64,
    non_billable_ms: i64,
}

/// Group entries by task then assignee and sum their durations.
///
/// Entries without a task id are dropped. The first entry seen for an
/// assignee fixes the reported assignee name.
pub fn aggregate_time_entries(entries: &[TimeEntry]) -> TaskTimeSummary {
    let mut order: Vec<String> = Vec::new();
    let mut buckets: HashMap<String, TaskBucket> = HashMap::new();

    for entry in entries {
        let Some(task_id) = entry.task_id.as_deref() else {
            continue;
        };

        let bucket = buckets.entry(task_id.to_string()).or_insert_with(|| {
            order.push(task_id.to_string());
            TaskBucket::default()
        });

        let slot = match bucket.index.get(&entry.user_id) {
            Some(&slot) => slot,
            None => {
                bucket.index.insert(entry.user_id.clone(), bucket.users.len());
                bucket.users.push(UserBucket {
                    user_id: entry.user_id.clone(),
                    username: entry.username.clone(),
                    billable_ms: 0,
                    non_billable_ms: 0,
                });
                bucket.users.len() - 1
            }
        };

        let user = &mut bucket.users[slot];
        if entry.billable {
            user.billable_ms += entry.duration_ms;
        } else {
            user.non_billable_ms += entry.duration_ms;
        }
    }

    let by_task = buckets
        .into_iter()
        .map(|(task_id, bucket)| {
            let summaries = bucket
                .users
                .into_iter()
                .map(|u| {
                    AssigneeTimeSummary::from_ms(u.user_id, u.username, u.billable_ms, u.non_billable_ms)
                })
                .collect();
            (task_id, summaries)
        })
        .collect();

    TaskTimeSummary { order, by_task }
}
