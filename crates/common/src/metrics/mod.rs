//! Metrics and observability utilities
//!
//! Provides Prometheus metrics with latency histograms
//! and standardized naming conventions.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all Hoard metrics
pub const METRICS_PREFIX: &str = "hoard";

/// Histogram buckets for request latency (in seconds)
pub const LATENCY_BUCKETS: &[f64] = &[
    0.001,  // 1ms
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

/// Name of the request latency histogram
pub fn request_duration_metric() -> String {
    format!("{}_request_duration_seconds", METRICS_PREFIX)
}

/// Register all metric descriptions
pub fn register_metrics() {
    // Request metrics
    describe_counter!(
        format!("{}_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of HTTP requests"
    );

    describe_histogram!(
        request_duration_metric(),
        Unit::Seconds,
        "HTTP request latency in seconds"
    );

    // Resource metrics
    describe_counter!(
        format!("{}_resource_writes_total", METRICS_PREFIX),
        Unit::Count,
        "Total resource creates and updates"
    );

    describe_counter!(
        format!("{}_constraint_violations_total", METRICS_PREFIX),
        Unit::Count,
        "Total write requests rejected by validation"
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
            request_duration_metric(),
            "method" => self.method,
            "endpoint" => self.endpoint
        )
        .record(duration);
    }
}

/// Record a successful create or update of a resource
pub fn record_write(resource: &str, operation: &str) {
    counter!(
        format!("{}_resource_writes_total", METRICS_PREFIX),
        "resource" => resource.to_string(),
        "operation" => operation.to_string()
    )
    .increment(1);
}

/// Record a write rejected by validation
pub fn record_violations(resource: &str, violations: usize) {
    counter!(
        format!("{}_constraint_violations_total", METRICS_PREFIX),
        "resource" => resource.to_string()
    )
    .increment(violations as u64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latency_buckets() {
        let mut prev = 0.0;
        for &bucket in LATENCY_BUCKETS {
            assert!(bucket > prev);
            prev = bucket;
        }
    }

    #[test]
    fn test_request_metrics() {
        let metrics = RequestMetrics::start("GET", "/api/treasures");
        std::thread::sleep(std::time::Duration::from_millis(5));
        metrics.finish(200);
        // Just verify it runs without panic
    }

    #[test]
    fn test_write_helpers_without_recorder() {
        record_write("Treasure", "POST");
        record_violations("Treasure", 2);
    }
}
