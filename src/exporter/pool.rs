//! Bounded list worker pool
//!
//! Each list is one unit of work: paginate its tasks, then fetch its time
//! entries. Lists are driven through an unordered bounded stream, so a slow
//! list never keeps the next ones from starting, and every worker additionally
//! holds a permit of a counting semaphore for the whole of its list. Sharing
//! that semaphore between pools makes the cap process-wide. Harvests are
//! put back into list order once all of them are in.
//!
//! The first failing list aborts the run: the remaining workers are dropped
//! and no partial result is returned.

use futures::stream::{self, StreamExt, TryStreamExt};
use indicatif::ProgressBar;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info};

use crate::fetcher::pagination::PaginationHelper;
use crate::fetcher::{ClickUpApi, FetcherError, FetcherResult};
use crate::{Task, TimeEntry, TimeWindow, WorkList};

/// Everything fetched for one list
#[derive(Debug, Clone, PartialEq)]
pub struct ListHarvest {
    /// The list
    pub list: WorkList,
    /// Tasks, annotated with the list's source metadata
    pub tasks: Vec<Task>,
    /// Time entries queried under the list
    pub time_entries: Vec<TimeEntry>,
}

/// Concurrency-capped list fetcher
pub struct ListWorkerPool {
    api: Arc<dyn ClickUpApi>,
    semaphore: Arc<Semaphore>,
    concurrency: usize,
    page_size: Option<usize>,
    progress: Option<ProgressBar>,
}

impl ListWorkerPool {
    /// Pool with its own semaphore of `concurrency` permits (at least 1)
    pub fn new(api: Arc<dyn ClickUpApi>, concurrency: usize) -> Self {
        let concurrency = concurrency.clamp(1, Semaphore::MAX_PERMITS);
        Self {
            api,
            semaphore: Arc::new(Semaphore::new(concurrency)),
            concurrency,
            page_size: None,
            progress: None,
        }
    }

    /// Draw worker permits from `semaphore` instead of a private one
    pub fn with_semaphore(mut self, semaphore: Arc<Semaphore>) -> Self {
        self.semaphore = semaphore;
        self
    }

    /// Enable the short-page stop of task pagination
    pub fn with_page_size(mut self, page_size: Option<usize>) -> Self {
        self.page_size = page_size;
        self
    }

    /// Tick `progress` once per finished list
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Maximum number of lists in flight
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Fetch every list, returning harvests in list order
    ///
    /// # Arguments
    /// * `lists` - Distinct lists to fetch
    /// * `team_id` - Team the time entries are queried under
    /// * `member_ids` - Assignee filter of the time entry query
    /// * `window` - Time entry window
    pub async fn run(
        &self,
        lists: Vec<WorkList>,
        team_id: &str,
        member_ids: &[String],
        window: &TimeWindow,
    ) -> FetcherResult<Vec<ListHarvest>> {
        info!(
            lists = lists.len(),
            concurrency = self.concurrency,
            "Processing lists"
        );
        if let Some(progress) = &self.progress {
            progress.set_length(lists.len() as u64);
        }

        let mut indexed: Vec<(usize, ListHarvest)> = stream::iter(lists.into_iter().enumerate())
            .map(|(index, list)| async move {
                self.process_list(list, team_id, member_ids, window)
                    .await
                    .map(|harvest| (index, harvest))
            })
            .buffer_unordered(self.concurrency)
            .try_collect()
            .await?;
        indexed.sort_by_key(|(index, _)| *index);
        let harvests = indexed.into_iter().map(|(_, harvest)| harvest).collect();

        if let Some(progress) = &self.progress {
            progress.finish_with_message("lists fetched");
        }
        Ok(harvests)
    }

    async fn process_list(
        &self,
        list: WorkList,
        team_id: &str,
        member_ids: &[String],
        window: &TimeWindow,
    ) -> FetcherResult<ListHarvest> {
        let _permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| FetcherError::Internal("worker pool semaphore closed".to_string()))?;

        debug!(list_id = %list.id, list_name = %list.name, "Fetching list");

        let mut tasks = PaginationHelper::paginate(&list.id, self.page_size, |page| {
            self.api.get_list_tasks_page(&list.id, page)
        })
        .await?;

        let source = list.source();
        for task in &mut tasks {
            task.source = source.clone();
        }

        let time_entries = self
            .api
            .get_time_entries(team_id, &list.id, window, member_ids)
            .await?;

        debug!(
            list_id = %list.id,
            tasks = tasks.len(),
            time_entries = time_entries.len(),
            "List fetched"
        );
        if let Some(progress) = &self.progress {
            progress.inc(1);
        }

        Ok(ListHarvest {
            list,
            tasks,
            time_entries,
        })
    }
}

impl std::fmt::Debug for ListWorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListWorkerPool")
            .field("concurrency", &self.concurrency)
            .field("available_permits", &self.semaphore.available_permits())
            .field("page_size", &self.page_size)
            .finish()
    }
}
