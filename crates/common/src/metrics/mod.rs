//! Metrics and observability utilities
//!
//! Prometheus metric names share one prefix; descriptions are registered
//! once at start-up.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all PatentDesk metrics
pub const METRICS_PREFIX: &str = "patentdesk";

/// Histogram buckets for request latency (in seconds)
pub const LATENCY_BUCKETS: &[f64] = &[
    0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500, 5.000, 10.00,
];

/// Register all metric descriptions
pub fn register_metrics() {
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

    describe_counter!(
        format!("{}_title_merges_total", METRICS_PREFIX),
        Unit::Count,
        "Titles created by merging other titles"
    );

    describe_counter!(
        format!("{}_merged_patents_total", METRICS_PREFIX),
        Unit::Count,
        "Patents carried into merged titles"
    );

    describe_counter!(
        format!("{}_import_rows_total", METRICS_PREFIX),
        Unit::Count,
        "Imported rows by outcome"
    );

    describe_histogram!(
        format!("{}_import_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "CSV import latency in seconds"
    );

    describe_counter!(
        format!("{}_evaluations_total", METRICS_PREFIX),
        Unit::Count,
        "Evaluation writes by operation"
    );

    describe_counter!(
        format!("{}_login_attempts_total", METRICS_PREFIX),
        Unit::Count,
        "Login attempts by outcome"
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

pub fn record_merge(patents: usize) {
    counter!(format!("{}_title_merges_total", METRICS_PREFIX)).increment(1);
    counter!(format!("{}_merged_patents_total", METRICS_PREFIX)).increment(patents as u64);
}

pub fn record_import(duration_secs: f64, imported: usize, failed: usize) {
    counter!(format!("{}_import_rows_total", METRICS_PREFIX), "outcome" => "imported")
        .increment(imported as u64);
    counter!(format!("{}_import_rows_total", METRICS_PREFIX), "outcome" => "failed")
        .increment(failed as u64);
    histogram!(format!("{}_import_duration_seconds", METRICS_PREFIX)).record(duration_secs);
}

pub fn record_evaluation(operation: &'static str, count: usize) {
    counter!(format!("{}_evaluations_total", METRICS_PREFIX), "operation" => operation)
        .increment(count as u64);
}

pub fn record_login(success: bool) {
    let outcome = if success { "success" } else { "failure" };
    counter!(format!("{}_login_attempts_total", METRICS_PREFIX), "outcome" => outcome).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latency_buckets_sorted() {
        let mut prev = 0.0;
        for &bucket in LATENCY_BUCKETS {
            assert!(bucket > prev);
            prev = bucket;
        }
    }

    #[test]
    fn test_recorders_without_exporter() {
        let metrics = RequestMetrics::start("GET", "/api/titles");
        metrics.finish(200);
        record_merge(3);
        record_import(0.5, 2, 1);
        record_evaluation("create", 1);
        record_login(false);
    }
}
