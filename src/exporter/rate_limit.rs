//! Client-side request budget
//!
//! ClickUp enforces a per-token request budget per minute. When configured,
//! every HTTP attempt of a run draws one permit from a shared [`RateLimiter`];
//! a permit returns to the pool one window after it was taken.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::sleep;

use crate::metrics::RateLimiterMetrics;

/// Sliding-window request limiter
#[derive(Clone)]
pub struct RateLimiter {
    semaphore: Arc<Semaphore>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    /// Create a request-based rate limiter
    ///
    /// # Arguments
    /// * `max_requests` - Maximum requests per window
    /// * `window` - Time window for rate limit
    pub fn request_based(max_requests: usize, window: Duration) -> Self {
        let max_requests = max_requests.min(Semaphore::MAX_PERMITS);
        Self {
            semaphore: Arc::new(Semaphore::new(max_requests)),
            max_requests,
            window,
        }
    }

    /// Limiter allowing `max_requests` per minute
    pub fn per_minute(max_requests: usize) -> Self {
        Self::request_based(max_requests, Duration::from_secs(60))
    }

    /// Configured budget per window
    pub fn max_requests(&self) -> usize {
        self.max_requests
    }

    /// Permits currently available
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Acquire permits for a request.
    ///
    /// The permits are held by a detached task for one window and released
    /// afterwards, so the budget slides with real time.
    pub async fn acquire(&self, weight: usize) -> Result<(), RateLimitError> {
        let mut metrics = RateLimiterMetrics::new();
        metrics.start_acquire();

        let permit = self
            .semaphore
            .clone()
            .acquire_many_owned(weight as u32)
            .await
            .map_err(|e| RateLimitError::AcquireError(e.to_string()))?;

        metrics.record_acquired(weight as u32);
        metrics.update_available_permits(self.semaphore.available_permits() as u32);

        let window = self.window;
        tokio::spawn(async move {
            sleep(window).await;
            drop(permit);
        });

        Ok(())
    }
}

/// Rate limiter errors
#[derive(Debug, thiserror::Error)]
pub enum RateLimitError {
    /// Failed to acquire permits
    #[error("failed to acquire rate limit permits: {0}")]
    AcquireError(String),
}
