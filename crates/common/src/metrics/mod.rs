//! Metrics and observability utilities
//!
//! Prometheus metrics for the store, the lifecycle engine, notifications
//! and the HTTP surface. All names share the `editorial_` prefix.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all editorial metrics
pub const METRICS_PREFIX: &str = "editorial";

/// Histogram buckets for request and store latency (in seconds).
/// Remote store round-trips dominate, so the range reaches 10s.
pub const LATENCY_BUCKETS: &[f64] = &[
    0.005,  // 5ms
    0.010,  // 10ms
    0.025,  // 25ms
    0.050,  // 50ms
    0.100,  // 100ms
    0.250,  // 250ms
    0.500,  // 500ms - typical contents API write
    1.000,  // 1s
    2.500,  // 2.5s
    5.000,  // 5s
    10.00,  // 10s - store timeout
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

    // Store metrics
    describe_counter!(
        format!("{}_store_operations_total", METRICS_PREFIX),
        Unit::Count,
        "Document store reads and writes by collection and outcome"
    );

    describe_histogram!(
        format!("{}_store_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Document store call latency in seconds"
    );

    describe_counter!(
        format!("{}_store_conflicts_total", METRICS_PREFIX),
        Unit::Count,
        "Writes rejected because the version token was stale"
    );

    describe_counter!(
        format!("{}_store_retries_total", METRICS_PREFIX),
        Unit::Count,
        "Read-modify-write attempts repeated after a retryable failure"
    );

    // Workflow metrics
    describe_counter!(
        format!("{}_transitions_total", METRICS_PREFIX),
        Unit::Count,
        "Submission status transitions"
    );

    describe_counter!(
        format!("{}_assignments_total", METRICS_PREFIX),
        Unit::Count,
        "Assignment engine runs by result"
    );

    describe_counter!(
        format!("{}_notifications_total", METRICS_PREFIX),
        Unit::Count,
        "Notifications by kind and delivery outcome"
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

/// Record one store call
pub fn record_store_operation(collection: &str, operation: &str, outcome: &str, duration_secs: f64) {
    counter!(
        format!("{}_store_operations_total", METRICS_PREFIX),
        "collection" => collection.to_string(),
        "operation" => operation.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);

    histogram!(
        format!("{}_store_duration_seconds", METRICS_PREFIX),
        "collection" => collection.to_string(),
        "operation" => operation.to_string()
    )
    .record(duration_secs);
}

/// Record a retry of a read-modify-write cycle
pub fn record_store_retry(collection: &str, conflict: bool) {
    counter!(
        format!("{}_store_retries_total", METRICS_PREFIX),
        "collection" => collection.to_string()
    )
    .increment(1);

    if conflict {
        counter!(
            format!("{}_store_conflicts_total", METRICS_PREFIX),
            "collection" => collection.to_string()
        )
        .increment(1);
    }
}

/// Record an applied status transition
pub fn record_transition(from: &str, to: &str) {
    counter!(
        format!("{}_transitions_total", METRICS_PREFIX),
        "from" => from.to_string(),
        "to" => to.to_string()
    )
    .increment(1);
}

/// Record an assignment engine run ("assigned", "no_pool", "skipped")
pub fn record_assignment(result: &str) {
    counter!(
        format!("{}_assignments_total", METRICS_PREFIX),
        "result" => result.to_string()
    )
    .increment(1);
}

/// Record a notification attempt
pub fn record_notification(kind: &str, delivered: bool) {
    let outcome = if delivered { "delivered" } else { "failed" };

    counter!(
        format!("{}_notifications_total", METRICS_PREFIX),
        "kind" => kind.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}
