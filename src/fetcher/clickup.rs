//! [`ClickUpApi`] over the ClickUp v2 REST API

use async_trait::async_trait;
use tracing::debug;

use crate::exporter::config::ExportConfig;
use crate::fetcher::clickup_http::ClickUpHttpClient;
use crate::fetcher::clickup_parser::ClickUpParser;
use crate::fetcher::pagination::Page;
use crate::fetcher::shared_resources::SharedResources;
use crate::fetcher::{ClickUpApi, FetcherResult};
use crate::{EntityRef, Folder, Space, Task, TimeEntry, TimeWindow};

/// HTTP-backed ClickUp API
pub struct ClickUpFetcher {
    http: ClickUpHttpClient,
}

impl ClickUpFetcher {
    /// Wrap an HTTP client
    pub fn new(http: ClickUpHttpClient) -> Self {
        Self { http }
    }

    /// Build the fetcher of one run from its configuration
    pub fn from_config(config: &ExportConfig) -> FetcherResult<Self> {
        let resources = SharedResources::from_config(config)?;
        let mut http = ClickUpHttpClient::new(
            resources.client,
            config.base_url.clone(),
            config.retry_policy(),
        );
        if let Some(limiter) = resources.rate_limiter {
            http = http.with_rate_limiter(limiter);
        }
        Ok(Self::new(http))
    }

    /// Underlying HTTP client
    pub fn http(&self) -> &ClickUpHttpClient {
        &self.http
    }
}

impl From<ClickUpHttpClient> for ClickUpFetcher {
    fn from(http: ClickUpHttpClient) -> Self {
        Self::new(http)
    }
}

#[async_trait]
impl ClickUpApi for ClickUpFetcher {
    async fn get_spaces(&self, team_id: &str) -> FetcherResult<Vec<Space>> {
        let body = self.http.get(&format!("/team/{team_id}/space"), &[]).await?;
        ClickUpParser::parse_spaces(body.as_ref())
    }

    async fn get_space_lists(&self, space_id: &str) -> FetcherResult<Vec<EntityRef>> {
        let body = self.http.get(&format!("/space/{space_id}/list"), &[]).await?;
        ClickUpParser::parse_lists(body.as_ref())
    }

    async fn get_folders(&self, space_id: &str) -> FetcherResult<Vec<Folder>> {
        let body = self.http.get(&format!("/space/{space_id}/folder"), &[]).await?;
        ClickUpParser::parse_folders(body.as_ref(), space_id)
    }

    async fn get_folder_lists(&self, folder_id: &str) -> FetcherResult<Vec<EntityRef>> {
        let body = self.http.get(&format!("/folder/{folder_id}/list"), &[]).await?;
        ClickUpParser::parse_lists(body.as_ref())
    }

    async fn get_list_tasks_page(&self, list_id: &str, page: u32) -> FetcherResult<Page<Task>> {
        let params = [
            ("page", page.to_string()),
            ("include_closed", "true".to_string()),
        ];
        let body = self.http.get(&format!("/list/{list_id}/task"), &params).await?;
        ClickUpParser::parse_task_page(body.as_ref())
    }

    async fn get_time_entries(
        &self,
        team_id: &str,
        list_id: &str,
        window: &TimeWindow,
        assignee_ids: &[String],
    ) -> FetcherResult<Vec<TimeEntry>> {
        let mut params = vec![
            ("list_id", list_id.to_string()),
            ("start", window.start_ms.to_string()),
            ("end", window.end_ms.to_string()),
            ("include_location_names", "true".to_string()),
        ];
        if !assignee_ids.is_empty() {
            params.push(("assignee", assignee_ids.join(",")));
        }

        let body = self
            .http
            .get(&format!("/team/{team_id}/time_entries"), &params)
            .await?;
        let entries = ClickUpParser::parse_time_entries(body.as_ref(), list_id)?;
        debug!(list_id = list_id, entries = entries.len(), "Fetched time entries");
        Ok(entries)
    }
}
