//! Metrics collection and exposition.
//!
//! # Metrics
//! - `rest_requests_total` (counter): total requests by method, status
//! - `rest_request_duration_seconds` (histogram): latency distribution
//! - `rest_auth_failures_total` (counter): rejected credentials by method
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade and is a no-op until an
//!   exporter is installed
//! - Prometheus exporter is opt-in via `observability.metrics_enabled`

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one served request.
pub fn record_request(method: &str, status: u16, start: Instant) {
    counter!(
        "rest_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("rest_request_duration_seconds", "method" => method.to_string())
        .record(start.elapsed().as_secs_f64());
}

/// Record one rejected authentication attempt.
pub fn record_auth_failure(scheme: &str) {
    counter!("rest_auth_failures_total", "scheme" => scheme.to_string()).increment(1);
}
