//! Observability metrics for export runs
//!
//! Counters and histograms for HTTP attempts, retries, 429 responses, the
//! client-side request budget and export runs, recorded through the `metrics`
//! facade. They are no-ops until [`init_metrics`] installs the Prometheus
//! exporter.

use metrics::{
    counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit,
};
use metrics_exporter_prometheus::PrometheusBuilder;
use once_cell::sync::OnceCell;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Set once the Prometheus exporter is installed
static METRICS_INITIALIZED: OnceCell<SocketAddr> = OnceCell::new();

/// Correlation ID generator for request tracing
static CORRELATION_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Install the Prometheus exporter and describe every metric.
///
/// Idempotent: later calls are no-ops.
///
/// # Arguments
/// * `addr` - Socket address of the scrape endpoint (e.g. "0.0.0.0:9090")
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    if let Some(existing) = METRICS_INITIALIZED.get() {
        debug!(addr = %existing, "Metrics already initialized, skipping");
        return Ok(());
    }

    info!("Initializing metrics system on {}", addr);

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {e}"))?;

    describe_counter!(
        "http_requests_total",
        Unit::Count,
        "Total number of HTTP requests made to the ClickUp API"
    );
    describe_counter!(
        "http_429_errors_total",
        Unit::Count,
        "Total number of 429 rate limit responses received"
    );
    describe_counter!(
        "http_retries_total",
        Unit::Count,
        "Total number of retry attempts"
    );
    describe_histogram!(
        "http_request_duration_seconds",
        Unit::Seconds,
        "HTTP request duration in seconds"
    );
    describe_histogram!(
        "retry_backoff_duration_seconds",
        Unit::Seconds,
        "Duration of retry backoff in seconds"
    );
    describe_counter!(
        "rate_limit_permits_acquired_total",
        Unit::Count,
        "Total number of request budget permits acquired"
    );
    describe_gauge!(
        "rate_limit_permits_available",
        Unit::Count,
        "Currently available request budget permits"
    );
    describe_histogram!(
        "rate_limit_queue_wait_seconds",
        Unit::Seconds,
        "Time spent waiting for request budget permits"
    );
    describe_counter!(
        "lists_processed_total",
        Unit::Count,
        "Total number of lists fetched by the worker pool"
    );
    describe_counter!(
        "exports_completed_total",
        Unit::Count,
        "Total number of successful export runs"
    );
    describe_counter!(
        "exports_failed_total",
        Unit::Count,
        "Total number of failed export runs"
    );

    let _ = METRICS_INITIALIZED.set(addr);
    info!("Metrics system initialized successfully on {}", addr);
    Ok(())
}

/// Generate a new correlation ID for request tracing
pub fn generate_correlation_id() -> String {
    let id = CORRELATION_COUNTER.fetch_add(1, Ordering::Relaxed) + 1;
    format!("req-{id:08x}")
}

/// Timing and outcome of one HTTP attempt
pub struct HttpRequestMetrics {
    endpoint: String,
    start_time: Instant,
    correlation_id: String,
    attempt: u32,
}

impl HttpRequestMetrics {
    /// Start recording an attempt
    pub fn start(endpoint: impl Into<String>, attempt: u32) -> Self {
        let endpoint = endpoint.into();
        let correlation_id = generate_correlation_id();

        debug!(
            correlation_id = %correlation_id,
            endpoint = %endpoint,
            attempt = attempt,
            "Starting HTTP request"
        );

        Self {
            endpoint,
            start_time: Instant::now(),
            correlation_id,
            attempt,
        }
    }

    /// Record a response with `status_code`
    pub fn record_complete(&self, status_code: u16) {
        let duration = self.start_time.elapsed();

        counter!(
            "http_requests_total",
            "endpoint" => self.endpoint.clone(),
            "status" => status_code.to_string(),
            "attempt" => self.attempt.to_string(),
        )
        .increment(1);

        histogram!(
            "http_request_duration_seconds",
            "endpoint" => self.endpoint.clone(),
        )
        .record(duration.as_secs_f64());

        if status_code == 429 {
            counter!(
                "http_429_errors_total",
                "endpoint" => self.endpoint.clone(),
            )
            .increment(1);

            warn!(
                correlation_id = %self.correlation_id,
                endpoint = %self.endpoint,
                attempt = self.attempt,
                duration_ms = duration.as_millis(),
                "Rate limit error (429) recorded"
            );
        }

        debug!(
            correlation_id = %self.correlation_id,
            endpoint = %self.endpoint,
            status = status_code,
            duration_ms = duration.as_millis(),
            "HTTP request completed"
        );
    }

    /// Record a transport failure (no status code)
    pub fn record_network_error(&self) {
        let duration = self.start_time.elapsed();

        counter!(
            "http_requests_total",
            "endpoint" => self.endpoint.clone(),
            "status" => "network_error",
            "attempt" => self.attempt.to_string(),
        )
        .increment(1);

        histogram!(
            "http_request_duration_seconds",
            "endpoint" => self.endpoint.clone(),
        )
        .record(duration.as_secs_f64());

        warn!(
            correlation_id = %self.correlation_id,
            endpoint = %self.endpoint,
            attempt = self.attempt,
            duration_ms = duration.as_millis(),
            "Network error recorded"
        );
    }

    /// Correlation ID of this attempt
    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }
}

/// Record a retry backoff
pub fn record_retry_backoff(duration: Duration, attempt: u32) {
    counter!(
        "http_retries_total",
        "attempt" => attempt.to_string(),
    )
    .increment(1);

    histogram!(
        "retry_backoff_duration_seconds",
        "attempt" => attempt.to_string(),
    )
    .record(duration.as_secs_f64());

    debug!(
        attempt = attempt,
        backoff_ms = duration.as_millis(),
        "Retry backoff recorded"
    );
}

/// Request budget metrics helper
#[derive(Default)]
pub struct RateLimiterMetrics {
    start_time: Option<Instant>,
}

impl RateLimiterMetrics {
    /// Create a new instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Start measuring queue wait time
    pub fn start_acquire(&mut self) {
        self.start_time = Some(Instant::now());
    }

    /// Record a successful permit acquisition
    pub fn record_acquired(&mut self, weight: u32) {
        if let Some(start) = self.start_time.take() {
            let wait_duration = start.elapsed();

            histogram!("rate_limit_queue_wait_seconds").record(wait_duration.as_secs_f64());
            counter!("rate_limit_permits_acquired_total").increment(u64::from(weight));

            if wait_duration.as_millis() > 100 {
                debug!(
                    weight = weight,
                    wait_ms = wait_duration.as_millis(),
                    "Request budget permit acquired after wait"
                );
            }
        }
    }

    /// Update the available permits gauge
    pub fn update_available_permits(&self, available: u32) {
        gauge!("rate_limit_permits_available").set(available as f64);
    }
}

/// Export run metrics
pub struct ExportMetrics {
    team_id: String,
    start_time: Instant,
}

impl ExportMetrics {
    /// Start tracking an export run
    pub fn start(team_id: impl Into<String>) -> Self {
        let team_id = team_id.into();
        info!(team_id = %team_id, "Export started");
        Self {
            team_id,
            start_time: Instant::now(),
        }
    }

    /// Record one list finished by the worker pool
    pub fn record_list(&self) {
        counter!("lists_processed_total", "team_id" => self.team_id.clone()).increment(1);
    }

    /// Record a successful run
    pub fn record_success(&self, lists: usize, records: usize) {
        counter!("exports_completed_total", "team_id" => self.team_id.clone()).increment(1);
        info!(
            team_id = %self.team_id,
            lists = lists,
            records = records,
            duration_ms = self.start_time.elapsed().as_millis(),
            "Export completed successfully"
        );
    }

    /// Record a failed run
    pub fn record_failure(&self, status: u16, error: &str) {
        counter!(
            "exports_failed_total",
            "team_id" => self.team_id.clone(),
            "status" => status.to_string(),
        )
        .increment(1);
        error!(
            team_id = %self.team_id,
            status = status,
            error = %error,
            duration_ms = self.start_time.elapsed().as_millis(),
            "Export failed"
        );
    }
}
