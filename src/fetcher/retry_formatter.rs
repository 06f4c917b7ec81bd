//! Retry message formatting for the ClickUp HTTP client.
//!
//! Classifies failed attempts and renders the warn/error lines emitted while
//! the client retries, so every retry log reads the same way.

use reqwest::{Error as ReqwestError, StatusCode};
use std::time::Duration;

/// Classification of a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryErrorType {
    /// Request timed out
    NetworkTimeout,
    /// Connection refused, DNS failure, or other offline scenarios
    NetworkOffline,
    /// HTTP 429
    RateLimit,
    /// HTTP 5xx
    ServerError(u16),
    /// Authentication failures (401/403)
    AuthFailed(u16),
    /// Other client errors (4xx, except 429)
    ClientError(u16),
    /// Anything else
    NetworkGeneric,
}

impl RetryErrorType {
    /// Short description used inside log messages
    pub fn description(&self) -> &'static str {
        match self {
            Self::NetworkTimeout => "network timeout",
            Self::NetworkOffline => "connection failed",
            Self::RateLimit => "rate limit exceeded",
            Self::ServerError(code) => match code {
                500 => "internal server error",
                502 => "bad gateway",
                503 => "service unavailable",
                504 => "gateway timeout",
                _ => "server error",
            },
            Self::AuthFailed(_) => "authentication failed",
            Self::ClientError(code) => match code {
                404 => "resource not found",
                _ => "client error",
            },
            Self::NetworkGeneric => "network error",
        }
    }

    /// Remediation hint shown once retries are exhausted
    pub fn suggestion(&self) -> &'static str {
        match self {
            Self::NetworkTimeout => "Check your network connection and firewall settings",
            Self::NetworkOffline => "Verify internet connectivity and DNS resolution",
            Self::RateLimit => "Lower --concurrency or set --rate-limit-per-minute",
            Self::ServerError(_) => "ClickUp may be experiencing issues, try again later",
            Self::AuthFailed(_) => "Verify CLICKUP_TOKEN and its access to the team",
            Self::ClientError(_) => "Check the team id and the requested resource",
            Self::NetworkGeneric => "Check network connectivity and try again",
        }
    }

    /// Whether the client retries this kind of failure
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            RetryErrorType::AuthFailed(_) | RetryErrorType::ClientError(_)
        )
    }
}

/// Context for formatting retry messages
#[derive(Debug, Clone)]
pub struct RetryContext {
    /// Current attempt number (1-based)
    pub attempt: u32,
    /// Total attempts allowed
    pub max_attempts: u32,
    /// Type of error that triggered the retry
    pub error_type: RetryErrorType,
    /// Delay before the next attempt
    pub backoff_duration: Duration,
    /// Original error message
    pub error_message: String,
    /// Endpoint path that failed
    pub endpoint: String,
}

impl RetryContext {
    /// Create a retry context
    pub fn new(
        attempt: u32,
        max_attempts: u32,
        error_type: RetryErrorType,
        backoff_duration: Duration,
        error_message: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            attempt,
            max_attempts,
            error_type,
            backoff_duration,
            error_message: error_message.into(),
            endpoint: endpoint.into(),
        }
    }

    /// Line logged before sleeping for the next attempt
    pub fn format_retry(&self) -> String {
        format!(
            "Retrying {} (attempt {}/{}) after {} - waiting {:.1} seconds...",
            self.endpoint,
            self.attempt,
            self.max_attempts,
            self.error_type.description(),
            self.backoff_duration.as_secs_f64()
        )
    }

    /// Summary logged when the last attempt fails
    pub fn format_failure(&self) -> String {
        let mut lines = vec![
            format!("[FAILED] Request failed after {} attempts", self.max_attempts),
            format!("  Last error: {}", self.error_message),
            format!("  Endpoint: {}", self.endpoint),
            "  Suggestions:".to_string(),
        ];
        lines.push(format!("    - {}", self.error_type.suggestion()));
        lines.push(format!(
            "    - Try increasing --max-retries (current: {})",
            self.max_attempts
        ));
        lines.join("\n")
    }
}

/// Classify a failed attempt from its HTTP status or reqwest error
pub fn extract_error_type(
    status: Option<StatusCode>,
    err: Option<&ReqwestError>,
) -> RetryErrorType {
    if let Some(status) = status {
        match status.as_u16() {
            401 | 403 => return RetryErrorType::AuthFailed(status.as_u16()),
            429 => return RetryErrorType::RateLimit,
            _ => {}
        }

        if status.is_server_error() {
            return RetryErrorType::ServerError(status.as_u16());
        }

        if status.is_client_error() {
            return RetryErrorType::ClientError(status.as_u16());
        }
    }

    if let Some(err) = err {
        if err.is_timeout() {
            return RetryErrorType::NetworkTimeout;
        }

        if err.is_connect() {
            return RetryErrorType::NetworkOffline;
        }
    }

    RetryErrorType::NetworkGeneric
}
