//! Run-scoped resources shared by every request of an export
//!
//! One export run builds one [`SharedResources`]: a single reqwest client
//! (connection pool, auth headers, timeouts) and, when configured, a single
//! request budget. Every worker of the run draws from these, so the budget
//! holds across the whole run instead of per worker.

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

use crate::exporter::config::{ExportConfig, HTTP_CONNECT_TIMEOUT_SECS};
use crate::exporter::rate_limit::RateLimiter;
use crate::fetcher::{FetcherError, FetcherResult};

/// HTTP client and request budget of one run
#[derive(Clone)]
pub struct SharedResources {
    /// Authenticated HTTP client
    pub client: Arc<Client>,
    /// Optional request budget
    pub rate_limiter: Option<Arc<RateLimiter>>,
}

impl SharedResources {
    /// Build the resources described by `config`
    pub fn from_config(config: &ExportConfig) -> FetcherResult<Self> {
        Ok(Self {
            client: build_http_client(&config.api_token, config.request_timeout)?,
            rate_limiter: config
                .rate_limit_per_minute
                .map(|n| Arc::new(RateLimiter::per_minute(n))),
        })
    }
}

/// Build a client sending the ClickUp token on every request
///
/// Configured with explicit timeouts to prevent indefinite hangs:
/// - Connect timeout: 10 seconds
/// - Request timeout: `request_timeout`, per attempt
pub fn build_http_client(api_token: &str, request_timeout: Duration) -> FetcherResult<Arc<Client>> {
    let mut headers = HeaderMap::new();
    let mut auth = HeaderValue::from_str(api_token)
        .map_err(|_| FetcherError::Internal("API token is not a valid header value".to_string()))?;
    auth.set_sensitive(true);
    headers.insert(AUTHORIZATION, auth);
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

    let client = Client::builder()
        .default_headers(headers)
        .connect_timeout(Duration::from_secs(HTTP_CONNECT_TIMEOUT_SECS))
        .timeout(request_timeout)
        .build()
        .map_err(|e| FetcherError::Internal(format!("failed to build HTTP client: {e}")))?;

    Ok(Arc::new(client))
}
