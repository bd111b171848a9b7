//! Observability metrics for the people loader
//!
//! Uses the `metrics` facade; nothing is exported unless [`init_metrics`] installs
//! the Prometheus recorder, in which case the counters below are served on the
//! given address.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use metrics_exporter_prometheus::PrometheusBuilder;
use once_cell::sync::OnceCell;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

static METRICS_INITIALIZED: OnceCell<SocketAddr> = OnceCell::new();

/// Metrics setup errors
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// Prometheus exporter could not be installed
    #[error("failed to install Prometheus exporter: {0}")]
    Install(String),
}

/// Install the Prometheus exporter on `addr`
///
/// Idempotent: later calls are no-ops and return the first address.
pub fn init_metrics(addr: SocketAddr) -> Result<SocketAddr, MetricsError> {
    if let Some(existing) = METRICS_INITIALIZED.get() {
        debug!(addr = %existing, "Metrics already initialized, skipping");
        return Ok(*existing);
    }

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| MetricsError::Install(e.to_string()))?;

    describe_counter!(
        "swapi_http_requests_total",
        Unit::Count,
        "HTTP requests issued, labelled by status"
    );
    describe_histogram!(
        "swapi_http_request_duration_seconds",
        Unit::Seconds,
        "HTTP request duration"
    );
    describe_counter!(
        "swapi_fetch_retries_total",
        Unit::Count,
        "Attempts that were retried after a decode or transport failure"
    );
    describe_counter!(
        "swapi_fetch_failures_total",
        Unit::Count,
        "Fetches that exhausted the retry ceiling"
    );
    describe_counter!(
        "swapi_records_persisted_total",
        Unit::Count,
        "People handed to the store"
    );
    describe_counter!(
        "swapi_records_missing_total",
        Unit::Count,
        "IDs answered with the not-found sentinel"
    );
    describe_counter!(
        "swapi_windows_completed_total",
        Unit::Count,
        "ID windows fully processed"
    );

    let addr = *METRICS_INITIALIZED.get_or_init(|| addr);
    info!(addr = %addr, "Metrics exporter listening");
    Ok(addr)
}

/// Whether [`init_metrics`] has succeeded
pub fn is_initialized() -> bool {
    METRICS_INITIALIZED.get().is_some()
}

/// Timing for a single HTTP attempt
pub struct HttpRequestMetrics {
    url: String,
    start_time: Instant,
    attempt: u32,
}

impl HttpRequestMetrics {
    /// Start timing an attempt
    pub fn start(url: impl Into<String>, attempt: u32) -> Self {
        Self {
            url: url.into(),
            start_time: Instant::now(),
            attempt,
        }
    }

    /// Record an attempt that produced a response
    pub fn record_complete(&self, status_code: u16) {
        let duration = self.start_time.elapsed();

        counter!("swapi_http_requests_total", "status" => status_code.to_string()).increment(1);
        histogram!("swapi_http_request_duration_seconds").record(duration.as_secs_f64());

        debug!(
            url = %self.url,
            status = status_code,
            attempt = self.attempt,
            duration_ms = duration.as_millis() as u64,
            "HTTP request completed"
        );
    }

    /// Record an attempt that never got a response
    pub fn record_network_error(&self) {
        let duration = self.start_time.elapsed();

        counter!("swapi_http_requests_total", "status" => "network_error").increment(1);
        histogram!("swapi_http_request_duration_seconds").record(duration.as_secs_f64());

        debug!(
            url = %self.url,
            attempt = self.attempt,
            duration_ms = duration.as_millis() as u64,
            "HTTP request failed without response"
        );
    }
}

/// Record a retry and the backoff about to be slept
pub fn record_retry_backoff(duration: Duration, attempt: u32) {
    counter!("swapi_fetch_retries_total", "attempt" => attempt.to_string()).increment(1);
    debug!(
        attempt,
        backoff_ms = duration.as_millis() as u64,
        "Retry backoff recorded"
    );
}

/// Record a fetch that ran out of attempts
pub fn record_fetch_failure() {
    counter!("swapi_fetch_failures_total").increment(1);
}

/// Record a person handed to the store
pub fn record_persisted() {
    counter!("swapi_records_persisted_total").increment(1);
}

/// Record an ID answered with the not-found sentinel
pub fn record_missing() {
    counter!("swapi_records_missing_total").increment(1);
}

/// Record a finished window
pub fn record_window_completed() {
    counter!("swapi_windows_completed_total").increment(1);
}

/// Run-level timing and outcome
pub struct RunMetrics {
    start_time: Instant,
    page_size: usize,
}

impl RunMetrics {
    /// Start tracking a run
    pub fn start(page_size: usize) -> Self {
        info!(page_size, "People load started");
        Self {
            start_time: Instant::now(),
            page_size,
        }
    }

    /// Record a completed run
    pub fn record_success(&self, processed: u64) {
        info!(
            page_size = self.page_size,
            processed,
            duration_secs = self.start_time.elapsed().as_secs_f64(),
            "People load completed"
        );
    }

    /// Record a failed run
    pub fn record_failure(&self, error: &str) {
        error!(
            page_size = self.page_size,
            error = %error,
            duration_secs = self.start_time.elapsed().as_secs_f64(),
            "People load failed"
        );
    }
}
