//! ClickUp HTTP client with bounded retry
//!
//! Every request goes through [`ClickUpHttpClient::request`], which:
//! - retries transport failures, 5xx and 429 up to `max_retries` attempts in total
//! - doubles the backoff after every retried attempt, whatever the cause
//! - honours `Retry-After` on 429, plus a jitter of 10% of the current backoff
//! - fails fast on any other non-success status

use async_trait::async_trait;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, Method, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

use crate::exporter::config::{calculate_backoff, INITIAL_BACKOFF_MS, MAX_RETRIES};
use crate::exporter::rate_limit::RateLimiter;
use crate::fetcher::retry_formatter::{extract_error_type, RetryContext, RetryErrorType};
use crate::fetcher::{FetcherError, FetcherResult};
use crate::metrics::{record_retry_backoff, HttpRequestMetrics};

/// Share of the current backoff added to every 429 wait
pub const RATE_LIMIT_JITTER_RATIO: f64 = 0.1;

/// Retry settings of a client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts per request, initial attempt included
    pub max_retries: u32,
    /// Delay before the second attempt
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: MAX_RETRIES,
            initial_backoff: Duration::from_millis(INITIAL_BACKOFF_MS),
        }
    }
}

/// Delay primitive used between attempts
#[async_trait]
pub trait Sleeper: Send + Sync {
    /// Suspend the caller for `duration`
    async fn sleep(&self, duration: Duration);
}

/// [`Sleeper`] backed by the tokio timer
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Outcome of a single failed attempt
enum AttemptError {
    /// Returned to the caller as is
    Fatal(FetcherError),
    /// Retried while attempts remain
    Retryable {
        error: FetcherError,
        error_type: RetryErrorType,
        retry_after: Option<Duration>,
    },
}

/// HTTP client for the ClickUp v2 API
pub struct ClickUpHttpClient {
    client: Arc<Client>,
    base_url: String,
    retry: RetryPolicy,
    rate_limiter: Option<Arc<RateLimiter>>,
    sleeper: Arc<dyn Sleeper>,
}

impl ClickUpHttpClient {
    /// Create a client
    ///
    /// # Arguments
    /// * `client` - Shared reqwest client carrying auth headers and timeouts
    /// * `base_url` - API root, e.g. `https://api.clickup.com/api/v2`
    /// * `retry` - Attempt budget and initial backoff
    pub fn new(client: Arc<Client>, base_url: impl Into<String>, retry: RetryPolicy) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            retry,
            rate_limiter: None,
            sleeper: Arc::new(TokioSleeper),
        }
    }

    /// Draw one permit from `rate_limiter` before every attempt
    pub fn with_rate_limiter(mut self, rate_limiter: Arc<RateLimiter>) -> Self {
        self.rate_limiter = Some(rate_limiter);
        self
    }

    /// Replace the delay primitive used between attempts
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// API root this client targets
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Retry settings of this client
    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// GET `path` with query `params`
    pub async fn get(&self, path: &str, params: &[(&str, String)]) -> FetcherResult<Option<Value>> {
        self.request(Method::GET, path, params).await
    }

    /// Execute a request with retry.
    ///
    /// Returns the parsed body for 200/201, `None` for 204 or a body that is
    /// not JSON.
    ///
    /// # Errors
    /// - `RemoteApi { status, .. }` with the response status for statuses that are not retried
    /// - `RemoteApi { status: 429, .. }` when rate limiting outlasts every attempt
    /// - `RemoteApi { status: 502, .. }` when transport failures or 5xx outlast every attempt
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, String)],
    ) -> FetcherResult<Option<Value>> {
        let url = format!("{}{}", self.base_url, path);
        let max_attempts = self.retry.max_retries.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;

            if let Some(limiter) = &self.rate_limiter {
                limiter
                    .acquire(1)
                    .await
                    .map_err(|e| FetcherError::Internal(e.to_string()))?;
            }

            let (error, error_type, retry_after) =
                match self.attempt(method.clone(), &url, path, params, attempt).await {
                    Ok(body) => return Ok(body),
                    Err(AttemptError::Fatal(error)) => return Err(error),
                    Err(AttemptError::Retryable {
                        error,
                        error_type,
                        retry_after,
                    }) => (error, error_type, retry_after),
                };

            let backoff = calculate_backoff(self.retry.initial_backoff, attempt - 1);
            let wait = match error_type {
                RetryErrorType::RateLimit => rate_limit_wait(retry_after, backoff),
                _ => backoff,
            };
            let ctx = RetryContext::new(
                attempt,
                max_attempts,
                error_type,
                wait,
                error.to_string(),
                path,
            );

            if attempt >= max_attempts {
                error!(endpoint = %path, attempts = attempt, "{}", ctx.format_failure());
                return Err(error);
            }

            warn!(
                endpoint = %path,
                attempt = attempt,
                max_attempts = max_attempts,
                "{}",
                ctx.format_retry()
            );
            record_retry_backoff(wait, attempt);
            self.sleeper.sleep(wait).await;
        }
    }

    async fn attempt(
        &self,
        method: Method,
        url: &str,
        path: &str,
        params: &[(&str, String)],
        attempt: u32,
    ) -> Result<Option<Value>, AttemptError> {
        let metrics = HttpRequestMetrics::start(path, attempt);

        let response = match self.client.request(method, url).query(params).send().await {
            Ok(response) => response,
            Err(e) => {
                metrics.record_network_error();
                return Err(AttemptError::Retryable {
                    error_type: extract_error_type(None, Some(&e)),
                    error: FetcherError::network(&e),
                    retry_after: None,
                });
            }
        };

        let status = response.status();
        metrics.record_complete(status.as_u16());

        match status {
            StatusCode::OK | StatusCode::CREATED => {
                let text = response.text().await.map_err(|e| AttemptError::Retryable {
                    error_type: extract_error_type(None, Some(&e)),
                    error: FetcherError::network(&e),
                    retry_after: None,
                })?;
                let body = serde_json::from_str(&text).ok();
                if body.is_none() {
                    debug!(endpoint = %path, "Response body is not JSON, treating as empty");
                }
                Ok(body)
            }
            StatusCode::NO_CONTENT => Ok(None),
            StatusCode::TOO_MANY_REQUESTS => Err(AttemptError::Retryable {
                error: FetcherError::rate_limited(),
                error_type: RetryErrorType::RateLimit,
                retry_after: parse_retry_after(response.headers()),
            }),
            s if s.is_server_error() => Err(AttemptError::Retryable {
                error: FetcherError::server(s.as_u16()),
                error_type: extract_error_type(Some(s), None),
                retry_after: None,
            }),
            s => {
                let body = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".to_string());
                warn!(endpoint = %path, status = s.as_u16(), "ClickUp request rejected");
                Err(AttemptError::Fatal(FetcherError::RemoteApi {
                    status: s.as_u16(),
                    message: format!("ClickUp API error: {body}"),
                }))
            }
        }
    }
}

/// Parse a `Retry-After` header given in (possibly fractional) seconds
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let raw = headers.get(RETRY_AFTER)?.to_str().ok()?;
    match raw.trim().parse::<f64>() {
        Ok(secs) if secs.is_finite() && secs >= 0.0 => Some(Duration::from_secs_f64(secs)),
        _ => {
            debug!(value = raw, "Ignoring unparseable Retry-After header");
            None
        }
    }
}

/// Delay before retrying a 429: `Retry-After` (or the backoff) plus jitter
pub fn rate_limit_wait(retry_after: Option<Duration>, backoff: Duration) -> Duration {
    retry_after.unwrap_or(backoff) + backoff.mul_f64(RATE_LIMIT_JITTER_RATIO)
}
