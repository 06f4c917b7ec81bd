//! ClickUp API access
//!
//! Layers, bottom-up:
//! - [`clickup_http`] - single request with bounded retry/backoff and 429/5xx handling
//! - [`pagination`] - drives a page fetcher until the server reports exhaustion
//! - [`clickup_parser`] - decodes response bodies into crate types
//! - [`clickup`] - the [`ClickUpApi`] implementation over HTTP

use crate::{EntityRef, Folder, Space, Task, TimeEntry, TimeWindow};
use async_trait::async_trait;

pub mod clickup;
pub mod clickup_http;
pub mod clickup_parser;
pub mod pagination;
pub mod retry_formatter;
pub mod shared_resources;

pub use clickup::ClickUpFetcher;
pub use clickup_http::{ClickUpHttpClient, RetryPolicy, Sleeper, TokioSleeper};
pub use pagination::{Page, PaginationHelper};

/// Status reported for transport failures and exhausted 5xx retries
pub const BAD_GATEWAY: u16 = 502;

/// Status reported when rate limiting outlasts every retry
pub const TOO_MANY_REQUESTS: u16 = 429;

/// Fetcher errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FetcherError {
    /// Remote API failure: an unretryable response, or retries exhausted
    #[error("remote API error {status}: {message}")]
    RemoteApi {
        /// HTTP-style status describing the failure
        status: u16,
        /// Error detail (response body for client errors)
        message: String,
    },

    /// Local coordination failure (closed semaphore, closed rate limiter)
    #[error("internal error: {0}")]
    Internal(String),
}

impl FetcherError {
    /// Transport failure after the last attempt
    pub fn network(detail: impl std::fmt::Display) -> Self {
        Self::RemoteApi {
            status: BAD_GATEWAY,
            message: format!("Network error: {detail}"),
        }
    }

    /// 5xx after the last attempt
    pub fn server(status: u16) -> Self {
        Self::RemoteApi {
            status: BAD_GATEWAY,
            message: format!("ClickUp server error {status}"),
        }
    }

    /// 429 after the last attempt
    pub fn rate_limited() -> Self {
        Self::RemoteApi {
            status: TOO_MANY_REQUESTS,
            message: "Rate limited by ClickUp and max retries exceeded".to_string(),
        }
    }

    /// 2xx body with a shape we cannot decode
    pub fn invalid_response(detail: impl std::fmt::Display) -> Self {
        Self::RemoteApi {
            status: BAD_GATEWAY,
            message: format!("Invalid response: {detail}"),
        }
    }

    /// Status code of the failure
    pub fn status(&self) -> u16 {
        match self {
            Self::RemoteApi { status, .. } => *status,
            Self::Internal(_) => 500,
        }
    }
}

/// Result type for fetcher operations
pub type FetcherResult<T> = Result<T, FetcherError>;

/// Remote work-hierarchy API consumed by the export pipeline.
///
/// Implementations must treat an absent or malformed 2xx body as an empty
/// collection rather than an error.
#[async_trait]
pub trait ClickUpApi: Send + Sync {
    /// List the spaces of a team, with their members
    async fn get_spaces(&self, team_id: &str) -> FetcherResult<Vec<Space>>;

    /// List the lists placed directly in a space
    async fn get_space_lists(&self, space_id: &str) -> FetcherResult<Vec<EntityRef>>;

    /// List the folders of a space
    async fn get_folders(&self, space_id: &str) -> FetcherResult<Vec<Folder>>;

    /// List the lists of a folder
    async fn get_folder_lists(&self, folder_id: &str) -> FetcherResult<Vec<EntityRef>>;

    /// Fetch one page of tasks of a list, closed tasks included
    ///
    /// # Arguments
    /// * `list_id` - List identifier
    /// * `page` - Zero-based page index
    async fn get_list_tasks_page(&self, list_id: &str, page: u32) -> FetcherResult<Page<Task>>;

    /// Fetch all time entries tracked against a list within a window
    ///
    /// # Arguments
    /// * `team_id` - Team identifier
    /// * `list_id` - List identifier
    /// * `window` - Time range of the entries
    /// * `assignee_ids` - Users whose entries are requested; empty means the API default
    async fn get_time_entries(
        &self,
        team_id: &str,
        list_id: &str,
        window: &TimeWindow,
        assignee_ids: &[String],
    ) -> FetcherResult<Vec<TimeEntry>>;
}
