//! Metrics and observability utilities
//!
//! Prometheus metrics with a shared prefix and standardized naming.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all ScrapeDeck metrics
pub const METRICS_PREFIX: &str = "scrapedeck";

/// Histogram buckets for request latency (in seconds)
pub const LATENCY_BUCKETS: &[f64] = &[
    0.005,  // 5ms
    0.010,  // 10ms
    0.025,  // 25ms
    0.050,  // 50ms
    0.100,  // 100ms
    0.250,  // 250ms
    0.500,  // 500ms
    1.000,  // 1s
    2.500,  // 2.5s
    5.000,  // 5s
];

/// Buckets for scraping API calls (scrapes can run for minutes)
pub const UPSTREAM_BUCKETS: &[f64] = &[
    0.100,  // 100ms
    0.500,  // 500ms
    1.000,  // 1s
    5.000,  // 5s
    15.00,  // 15s
    30.00,  // 30s
    60.00,  // 1m
    120.0,  // 2m
];

/// Register all metric descriptions
pub fn register_metrics() {
    // Request metrics
    describe_counter!(
        format!("{}_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of HTTP requests"
    );

    describe_histogram!(
        format!("{}_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "HTTP request latency in seconds"
    );

    // Scraping API metrics
    describe_counter!(
        format!("{}_api_calls_total", METRICS_PREFIX),
        Unit::Count,
        "Total scraping API calls"
    );

    describe_histogram!(
        format!("{}_api_call_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Scraping API latency in seconds"
    );

    // Workflow metrics
    describe_counter!(
        format!("{}_jobs_provisioned_total", METRICS_PREFIX),
        Unit::Count,
        "Job creation workflow outcomes"
    );

    describe_counter!(
        format!("{}_accounts_found_total", METRICS_PREFIX),
        Unit::Count,
        "Accounts added to username pools by the finder"
    );

    // Stats metrics
    describe_counter!(
        format!("{}_stats_fallbacks_total", METRICS_PREFIX),
        Unit::Count,
        "Job statistics that degraded to zero"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record request metrics
pub struct RequestMetrics {
    start: Instant,
    endpoint: String,
    method: String,
}

impl RequestMetrics {
    /// Start tracking a request
    pub fn start(method: &str, endpoint: &str) -> Self {
        Self {
            start: Instant::now(),
            endpoint: endpoint.to_string(),
            method: method.to_string(),
        }
    }

    /// Record request completion
    pub fn finish(self, status: u16) {
        let duration = self.start.elapsed().as_secs_f64();

        counter!(
            format!("{}_requests_total", METRICS_PREFIX),
            "method" => self.method.clone(),
            "endpoint" => self.endpoint.clone(),
            "status" => status.to_string()
        )
        .increment(1);

        histogram!(
            format!("{}_request_duration_seconds", METRICS_PREFIX),
            "method" => self.method,
            "endpoint" => self.endpoint
        )
        .record(duration);
    }
}

/// Record a scraping API call
pub fn record_api_call(endpoint: &str, duration_secs: f64, success: bool) {
    let status = if success { "success" } else { "error" };

    counter!(
        format!("{}_api_calls_total", METRICS_PREFIX),
        "endpoint" => endpoint.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(
        format!("{}_api_call_duration_seconds", METRICS_PREFIX),
        "endpoint" => endpoint.to_string()
    )
    .record(duration_secs);
}

/// Record the outcome of a job creation workflow
pub fn record_provisioning(outcome: &str, platform: &str) {
    counter!(
        format!("{}_jobs_provisioned_total", METRICS_PREFIX),
        "outcome" => outcome.to_string(),
        "platform" => platform.to_string()
    )
    .increment(1);
}

/// Record accounts added by the finder
pub fn record_accounts_found(count: u32, platform: &str) {
    counter!(
        format!("{}_accounts_found_total", METRICS_PREFIX),
        "platform" => platform.to_string()
    )
    .increment(u64::from(count));
}

/// Record a statistics query that fell back to zeros
pub fn record_stats_fallback(path: &str) {
    counter!(
        format!("{}_stats_fallbacks_total", METRICS_PREFIX),
        "path" => path.to_string()
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buckets_sorted() {
        for buckets in [LATENCY_BUCKETS, UPSTREAM_BUCKETS] {
            let mut prev = 0.0;
            for &bucket in buckets {
                assert!(bucket > prev);
                prev = bucket;
            }
        }
    }

    #[test]
    fn test_request_metrics() {
        let metrics = RequestMetrics::start("GET", "/api/jobs/instagram");
        metrics.finish(200);
        record_api_call("/api/ingest", 0.2, false);
        record_stats_fallback("tenant");
        // Without an installed recorder these are no-ops
    }
}
