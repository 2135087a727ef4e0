//! Metrics and observability utilities
//!
//! Prometheus metrics through the `metrics` facade with standardized naming.
//! The recorder itself is installed by the binary.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all Omnyla metrics
pub const METRICS_PREFIX: &str = "omnyla";

/// Buckets for whole-analysis latency (in seconds); the ceiling is the 60s deadline
pub const ANALYSIS_BUCKETS: &[f64] = &[
    0.050,  // 50ms
    0.100,  // 100ms
    0.250,  // 250ms
    0.500,  // 500ms
    1.000,  // 1s
    2.500,  // 2.5s
    5.000,  // 5s
    10.00,  // 10s
    30.00,  // 30s - annotator timeout
    60.00,  // 60s - request deadline
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

    // Analysis metrics
    describe_counter!(
        format!("{}_analyses_total", METRICS_PREFIX),
        Unit::Count,
        "Completed analyses by execution path"
    );

    describe_histogram!(
        format!("{}_analysis_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Pipeline latency in seconds"
    );

    describe_counter!(
        format!("{}_annotator_runs_total", METRICS_PREFIX),
        Unit::Count,
        "External annotator invocations by outcome"
    );

    // Enrichment metrics
    describe_counter!(
        format!("{}_trial_searches_total", METRICS_PREFIX),
        Unit::Count,
        "Clinical trial registry searches"
    );

    describe_gauge!(
        format!("{}_trials_returned", METRICS_PREFIX),
        Unit::Count,
        "Recruiting trials kept from the last search"
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

/// Helper to record a finished analysis
pub fn record_analysis(duration_secs: f64, path: &str, num_variants: usize) {
    counter!(
        format!("{}_analyses_total", METRICS_PREFIX),
        "path" => path.to_string()
    )
    .increment(1);

    histogram!(
        format!("{}_analysis_duration_seconds", METRICS_PREFIX),
        "path" => path.to_string()
    )
    .record(duration_secs);

    tracing::debug!(path, num_variants, "Analysis recorded");
}

/// Helper to record an annotator invocation
pub fn record_annotator(outcome: &str) {
    counter!(
        format!("{}_annotator_runs_total", METRICS_PREFIX),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Helper to record a trial search
pub fn record_trial_search(success: bool, kept: usize) {
    let status = if success { "success" } else { "error" };

    counter!(
        format!("{}_trial_searches_total", METRICS_PREFIX),
        "status" => status.to_string()
    )
    .increment(1);

    if success {
        gauge!(format!("{}_trials_returned", METRICS_PREFIX)).set(kept as f64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analysis_buckets() {
        let mut prev = 0.0;
        for &bucket in ANALYSIS_BUCKETS {
            assert!(bucket > prev);
            prev = bucket;
        }

        // Both configured timeouts should be bucket edges
        assert!(ANALYSIS_BUCKETS.contains(&30.00));
        assert!(ANALYSIS_BUCKETS.contains(&60.00));
    }

    #[test]
    fn test_helpers_without_recorder() {
        let metrics = RequestMetrics::start("POST", "/api/analyze-vcf");
        metrics.finish(200);
        record_analysis(0.2, "annotator", 3);
        record_annotator("unavailable");
        record_trial_search(false, 0);
        // No recorder installed: just verify nothing panics
    }
}
