//! Export configuration
//!
//! Settings are gathered once per invocation into an [`ExportConfig`] and
//! passed down explicitly; nothing here is process-global.

use std::fmt;
use std::time::Duration;
use tokio::sync::Semaphore;

use crate::exporter::ExportError;
use crate::fetcher::RetryPolicy;
use crate::TimeWindow;

/// ClickUp REST API root
pub const CLICKUP_API_BASE: &str = "https://api.clickup.com/api/v2";

/// Default number of lists fetched concurrently
pub const DEFAULT_CONCURRENCY: usize = 5;

/// Default number of attempts per request (initial attempt included)
pub const MAX_RETRIES: u32 = 5;

/// Initial backoff delay in milliseconds, doubled after every retried attempt
pub const INITIAL_BACKOFF_MS: u64 = 1000;

/// Task page size used by ClickUp
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// HTTP connect timeout (seconds)
pub const HTTP_CONNECT_TIMEOUT_SECS: u64 = 10;

/// HTTP request timeout (seconds), per attempt
pub const HTTP_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Token placeholder shipped in sample configuration
const TOKEN_PLACEHOLDER_PREFIX: &str = "pk_YOUR";

/// Team id placeholder shipped in sample configuration
const TEAM_PLACEHOLDER_PREFIX: &str = "YOUR";

/// Exponential backoff for the given retry count, without a cap.
///
/// `retry_count` 0 yields `initial`, 1 yields `2 * initial`, and so on.
pub fn calculate_backoff(initial: Duration, retry_count: u32) -> Duration {
    initial.saturating_mul(2u32.saturating_pow(retry_count))
}

/// Full configuration of one export run
#[derive(Clone)]
pub struct ExportConfig {
    /// ClickUp API token
    pub api_token: String,
    /// Team (workspace) identifier
    pub team_id: String,
    /// API base URL
    pub base_url: String,
    /// Maximum number of lists fetched at once
    pub concurrency: usize,
    /// Attempts per request
    pub max_retries: u32,
    /// First retry delay
    pub initial_backoff: Duration,
    /// Task page size; a shorter page ends pagination when the API sends no last-page flag
    pub page_size: Option<usize>,
    /// Per-attempt HTTP timeout
    pub request_timeout: Duration,
    /// Optional client-side request budget per minute
    pub rate_limit_per_minute: Option<usize>,
    /// Time entry window
    pub window: TimeWindow,
}

impl ExportConfig {
    /// Create a configuration with default tuning
    pub fn new(api_token: impl Into<String>, team_id: impl Into<String>, window: TimeWindow) -> Self {
        Self {
            api_token: api_token.into(),
            team_id: team_id.into(),
            base_url: CLICKUP_API_BASE.to_string(),
            concurrency: DEFAULT_CONCURRENCY,
            max_retries: MAX_RETRIES,
            initial_backoff: Duration::from_millis(INITIAL_BACKOFF_MS),
            page_size: Some(DEFAULT_PAGE_SIZE),
            request_timeout: Duration::from_secs(HTTP_REQUEST_TIMEOUT_SECS),
            rate_limit_per_minute: None,
            window,
        }
    }

    /// Override the API base URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the list concurrency
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Set the number of attempts per request
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the initial backoff
    pub fn with_initial_backoff(mut self, initial_backoff: Duration) -> Self {
        self.initial_backoff = initial_backoff;
        self
    }

    /// Set the task page size
    pub fn with_page_size(mut self, page_size: Option<usize>) -> Self {
        self.page_size = page_size;
        self
    }

    /// Set the per-attempt timeout
    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    /// Enable a client-side request budget
    pub fn with_rate_limit_per_minute(mut self, requests: Option<usize>) -> Self {
        self.rate_limit_per_minute = requests;
        self
    }

    /// Check the configuration before any network call is made
    pub fn validate(&self) -> Result<(), ExportError> {
        let token = self.api_token.trim();
        if token.is_empty() || token.starts_with(TOKEN_PLACEHOLDER_PREFIX) {
            return Err(ExportError::Configuration(
                "Please set CLICKUP_TOKEN and CLICKUP_TEAM_ID (or pass team_id).".to_string(),
            ));
        }

        let team_id = self.team_id.trim();
        if team_id.is_empty() || team_id.starts_with(TEAM_PLACEHOLDER_PREFIX) {
            return Err(ExportError::Configuration(
                "Please set CLICKUP_TOKEN and CLICKUP_TEAM_ID (or pass team_id).".to_string(),
            ));
        }

        if self.concurrency == 0 {
            return Err(ExportError::Configuration(
                "concurrency must be at least 1".to_string(),
            ));
        }
        if self.concurrency > Semaphore::MAX_PERMITS {
            return Err(ExportError::Configuration(format!(
                "concurrency must be at most {}",
                Semaphore::MAX_PERMITS
            )));
        }

        if self.max_retries == 0 {
            return Err(ExportError::Configuration(
                "max retries must be at least 1".to_string(),
            ));
        }

        if self.page_size == Some(0) {
            return Err(ExportError::Configuration(
                "page size must be at least 1".to_string(),
            ));
        }

        if self.rate_limit_per_minute == Some(0) {
            return Err(ExportError::Configuration(
                "rate limit must allow at least 1 request per minute".to_string(),
            ));
        }
        if let Some(limit) = self.rate_limit_per_minute {
            if limit > Semaphore::MAX_PERMITS {
                return Err(ExportError::Configuration(format!(
                    "rate limit must be at most {} requests per minute",
                    Semaphore::MAX_PERMITS
                )));
            }
        }

        self.window.validate().map_err(ExportError::Configuration)
    }

    /// Retry settings for the HTTP client
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            initial_backoff: self.initial_backoff,
        }
    }

    /// Pipeline settings for [`crate::Exporter`]
    pub fn options(&self) -> ExportOptions {
        ExportOptions {
            concurrency: self.concurrency,
            page_size: self.page_size,
            window: self.window,
        }
    }
}

impl fmt::Debug for ExportConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExportConfig")
            .field("api_token", &"<redacted>")
            .field("team_id", &self.team_id)
            .field("base_url", &self.base_url)
            .field("concurrency", &self.concurrency)
            .field("max_retries", &self.max_retries)
            .field("initial_backoff", &self.initial_backoff)
            .field("page_size", &self.page_size)
            .field("request_timeout", &self.request_timeout)
            .field("rate_limit_per_minute", &self.rate_limit_per_minute)
            .field("window", &self.window)
            .finish()
    }
}

/// Pipeline settings that do not concern transport
#[derive(Debug, Clone, PartialEq)]
pub struct ExportOptions {
    /// Maximum number of lists fetched at once
    pub concurrency: usize,
    /// Task page size hint for pagination
    pub page_size: Option<usize>,
    /// Time entry window
    pub window: TimeWindow,
}

impl ExportOptions {
    /// Options with default concurrency and page size
    pub fn new(window: TimeWindow) -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            page_size: Some(DEFAULT_PAGE_SIZE),
            window,
        }
    }

    /// Set the list concurrency
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }
}
