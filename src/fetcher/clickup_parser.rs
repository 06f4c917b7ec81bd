//! ClickUp response parser
//!
//! Stateless functions turning ClickUp v2 JSON bodies into crate types.
//! A missing body, a missing collection key or a `null` collection decodes to
//! an empty collection. ClickUp sends ids, timestamps and durations either as
//! strings or as numbers; both are accepted.

use crate::fetcher::pagination::Page;
use crate::fetcher::{FetcherError, FetcherResult};
use crate::{Assignee, EntityRef, Folder, Space, Task, TaskSource, TimeEntry};
use serde_json::Value;

/// Stateless parser for ClickUp API responses
pub struct ClickUpParser;

impl ClickUpParser {
    /// Parse `GET /team/{team_id}/space`
    ///
    /// Member ids are read from `members[].user.id`.
    pub fn parse_spaces(body: Option<&Value>) -> FetcherResult<Vec<Space>> {
        Self::collection(body, "spaces")?
            .iter()
            .map(|space| {
                let (id, name) = Self::identity(space, "space")?;
                let member_ids = match space.get("members") {
                    Some(Value::Array(members)) => members
                        .iter()
                        .filter_map(|m| m.get("user").and_then(|u| u.get("id")))
                        .filter_map(Self::id_of)
                        .collect(),
                    _ => Vec::new(),
                };
                Ok(Space {
                    id,
                    name,
                    member_ids,
                })
            })
            .collect()
    }

    /// Parse `GET /space/{id}/list` and `GET /folder/{id}/list`
    pub fn parse_lists(body: Option<&Value>) -> FetcherResult<Vec<EntityRef>> {
        Self::collection(body, "lists")?
            .iter()
            .map(|list| {
                let (id, name) = Self::identity(list, "list")?;
                Ok(EntityRef { id, name })
            })
            .collect()
    }

    /// Parse `GET /space/{space_id}/folder`
    pub fn parse_folders(body: Option<&Value>, space_id: &str) -> FetcherResult<Vec<Folder>> {
        Self::collection(body, "folders")?
            .iter()
            .map(|folder| {
                let (id, name) = Self::identity(folder, "folder")?;
                Ok(Folder {
                    id,
                    name,
                    space_id: space_id.to_string(),
                })
            })
            .collect()
    }

    /// Parse one page of `GET /list/{list_id}/task`
    ///
    /// Tasks carry an empty [`TaskSource`]; the worker that fetched the page fills it in.
    pub fn parse_task_page(body: Option<&Value>) -> FetcherResult<Page<Task>> {
        let items = Self::collection(body, "tasks")?
            .iter()
            .map(Self::parse_task)
            .collect::<FetcherResult<Vec<_>>>()?;
        let last_page = body.and_then(|b| b.get("last_page")).and_then(Value::as_bool);
        Ok(Page { items, last_page })
    }

    /// Parse `GET /team/{team_id}/time_entries`
    ///
    /// # Arguments
    /// * `list_id` - List the entries were queried under, stamped on every entry
    pub fn parse_time_entries(body: Option<&Value>, list_id: &str) -> FetcherResult<Vec<TimeEntry>> {
        Self::collection(body, "data")?
            .iter()
            .map(|entry| Self::parse_time_entry(entry, list_id))
            .collect()
    }

    fn parse_task(task: &Value) -> FetcherResult<Task> {
        let (id, name) = Self::identity(task, "task")?;

        let status = task
            .get("status")
            .and_then(|s| s.get("status").or(Some(s)))
            .and_then(Value::as_str)
            .map(str::to_string);

        let assignees = match task.get("assignees") {
            Some(Value::Array(assignees)) => assignees
                .iter()
                .filter_map(|a| {
                    let id = a.get("id").and_then(Self::id_of)?;
                    let username = a
                        .get("username")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string();
                    Some(Assignee { id, username })
                })
                .collect(),
            _ => Vec::new(),
        };

        Ok(Task {
            id,
            name,
            status,
            assignees,
            due_date_ms: Self::millis(task.get("due_date")),
            date_created_ms: Self::millis(task.get("date_created")),
            time_estimate_ms: Self::millis(task.get("time_estimate")),
            time_spent_ms: Self::millis(task.get("time_spent")),
            custom_fields: task
                .get("custom_fields")
                .cloned()
                .unwrap_or_else(|| Value::Array(Vec::new())),
            source: TaskSource::default(),
        })
    }

    fn parse_time_entry(entry: &Value, list_id: &str) -> FetcherResult<TimeEntry> {
        let user = entry
            .get("user")
            .ok_or_else(|| FetcherError::invalid_response("time entry without user"))?;
        let user_id = user
            .get("id")
            .and_then(Self::id_of)
            .ok_or_else(|| FetcherError::invalid_response("time entry user without id"))?;
        let username = user
            .get("username")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let duration_ms = Self::millis(entry.get("duration")).ok_or_else(|| {
            FetcherError::invalid_response(format!("time entry of user {user_id} without duration"))
        })?;

        Ok(TimeEntry {
            id: entry.get("id").and_then(Self::id_of),
            task_id: entry
                .get("task")
                .and_then(|t| t.get("id"))
                .and_then(Self::id_of),
            user_id,
            username,
            duration_ms,
            billable: entry
                .get("billable")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            list_id: list_id.to_string(),
        })
    }

    /// Array under `key`, empty when the body or the key is absent
    fn collection<'a>(body: Option<&'a Value>, key: &str) -> FetcherResult<&'a [Value]> {
        match body.and_then(|b| b.get(key)) {
            None | Some(Value::Null) => Ok(&[]),
            Some(Value::Array(items)) => Ok(items.as_slice()),
            Some(other) => Err(FetcherError::invalid_response(format!(
                "expected `{key}` to be an array, got {other}"
            ))),
        }
    }

    fn identity(value: &Value, kind: &str) -> FetcherResult<(String, String)> {
        let id = value
            .get("id")
            .and_then(Self::id_of)
            .ok_or_else(|| FetcherError::invalid_response(format!("{kind} without id")))?;
        let name = value
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        Ok((id, name))
    }

    fn id_of(value: &Value) -> Option<String> {
        match value {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    fn millis(value: Option<&Value>) -> Option<i64> {
        match value? {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        }
    }
}
