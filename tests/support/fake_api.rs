//! In-memory ClickUpApi used by pipeline tests

#![allow(dead_code)]

use async_trait::async_trait;
use clickup_time_export::fetcher::{ClickUpApi, FetcherError, FetcherResult, Page};
use clickup_time_export::{
    Assignee, EntityRef, Folder, Space, Task, TaskSource, TimeEntry, TimeWindow,
};
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Scripted ClickUp hierarchy
#[derive(Default)]
pub struct FakeClickUp {
    spaces: Vec<Space>,
    space_lists: HashMap<String, Vec<EntityRef>>,
    folders: HashMap<String, Vec<Folder>>,
    folder_lists: HashMap<String, Vec<EntityRef>>,
    task_pages: HashMap<String, Vec<Page<Task>>>,
    entries: HashMap<String, Vec<TimeEntry>>,
    failing_lists: HashSet<String>,
    delay: Duration,
    list_delays: HashMap<String, Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    calls: Mutex<Vec<String>>,
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl FakeClickUp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_space(mut self, id: &str, name: &str, members: &[&str]) -> Self {
        self.spaces.push(Space {
            id: id.to_string(),
            name: name.to_string(),
            member_ids: members.iter().map(|m| m.to_string()).collect(),
        });
        self
    }

    pub fn with_space_list(mut self, space_id: &str, list_id: &str, name: &str) -> Self {
        self.space_lists
            .entry(space_id.to_string())
            .or_default()
            .push(EntityRef::new(list_id, name));
        self
    }

    pub fn with_folder(mut self, space_id: &str, folder_id: &str, name: &str) -> Self {
        self.folders.entry(space_id.to_string()).or_default().push(Folder {
            id: folder_id.to_string(),
            name: name.to_string(),
            space_id: space_id.to_string(),
        });
        self
    }

    pub fn with_folder_list(mut self, folder_id: &str, list_id: &str, name: &str) -> Self {
        self.folder_lists
            .entry(folder_id.to_string())
            .or_default()
            .push(EntityRef::new(list_id, name));
        self
    }

    /// Tasks of a list served as one page per inner vector, the last one marked
    pub fn with_tasks(mut self, list_id: &str, pages: Vec<Vec<Task>>) -> Self {
        let count = pages.len();
        let pages = pages
            .into_iter()
            .enumerate()
            .map(|(i, items)| Page::new(items, i + 1 == count))
            .collect();
        self.task_pages.insert(list_id.to_string(), pages);
        self
    }

    pub fn with_entries(mut self, list_id: &str, entries: Vec<TimeEntry>) -> Self {
        self.entries.insert(list_id.to_string(), entries);
        self
    }

    /// Every request about `list_id` fails as exhausted 5xx retries would
    pub fn failing_list(mut self, list_id: &str) -> Self {
        self.failing_lists.insert(list_id.to_string());
        self
    }

    /// Latency of every list-level request
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Latency of list-level requests about `list_id`, overriding `with_delay`
    pub fn with_list_delay(mut self, list_id: &str, delay: Duration) -> Self {
        self.list_delays.insert(list_id.to_string(), delay);
        self
    }

    /// Highest number of list-level requests seen in flight at once
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Recorded calls, e.g. `tasks:l1:0` or `entries:l1`
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    async fn list_request(&self, list_id: &str) -> FetcherResult<()> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = InFlight(&self.in_flight);
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = self.list_delays.get(list_id).copied().unwrap_or(self.delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.failing_lists.contains(list_id) {
            return Err(FetcherError::server(500));
        }
        Ok(())
    }
}

#[async_trait]
impl ClickUpApi for FakeClickUp {
    async fn get_spaces(&self, team_id: &str) -> FetcherResult<Vec<Space>> {
        self.record(format!("spaces:{team_id}"));
        Ok(self.spaces.clone())
    }

    async fn get_space_lists(&self, space_id: &str) -> FetcherResult<Vec<EntityRef>> {
        self.record(format!("space_lists:{space_id}"));
        Ok(self.space_lists.get(space_id).cloned().unwrap_or_default())
    }

    async fn get_folders(&self, space_id: &str) -> FetcherResult<Vec<Folder>> {
        self.record(format!("folders:{space_id}"));
        Ok(self.folders.get(space_id).cloned().unwrap_or_default())
    }

    async fn get_folder_lists(&self, folder_id: &str) -> FetcherResult<Vec<EntityRef>> {
        self.record(format!("folder_lists:{folder_id}"));
        Ok(self.folder_lists.get(folder_id).cloned().unwrap_or_default())
    }

    async fn get_list_tasks_page(&self, list_id: &str, page: u32) -> FetcherResult<Page<Task>> {
        self.record(format!("tasks:{list_id}:{page}"));
        self.list_request(list_id).await?;
        Ok(self
            .task_pages
            .get(list_id)
            .and_then(|pages| pages.get(page as usize))
            .cloned()
            .unwrap_or_default())
    }

    async fn get_time_entries(
        &self,
        _team_id: &str,
        list_id: &str,
        _window: &TimeWindow,
        _assignee_ids: &[String],
    ) -> FetcherResult<Vec<TimeEntry>> {
        self.record(format!("entries:{list_id}"));
        self.list_request(list_id).await?;
        Ok(self.entries.get(list_id).cloned().unwrap_or_default())
    }
}

pub fn task(id: &str, assignee: Option<(&str, &str)>) -> Task {
    Task {
        id: id.to_string(),
        name: format!("Task {id}"),
        status: Some("open".to_string()),
        assignees: assignee
            .map(|(id, username)| {
                vec![Assignee {
                    id: id.to_string(),
                    username: username.to_string(),
                }]
            })
            .unwrap_or_default(),
        due_date_ms: None,
        date_created_ms: Some(1_735_689_600_000),
        time_estimate_ms: None,
        time_spent_ms: None,
        custom_fields: json!([]),
        source: TaskSource::default(),
    }
}

pub fn entry(task_id: Option<&str>, user: (&str, &str), ms: i64, billable: bool, list_id: &str) -> TimeEntry {
    TimeEntry {
        id: None,
        task_id: task_id.map(str::to_string),
        user_id: user.0.to_string(),
        username: user.1.to_string(),
        duration_ms: ms,
        billable,
        list_id: list_id.to_string(),
    }
}

pub fn window() -> TimeWindow {
    TimeWindow::new(1_735_671_600_000, 1_767_207_600_000).unwrap()
}
