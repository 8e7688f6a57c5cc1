//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define kernel metrics (requests, latency, render warnings)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `kernel_requests_total` (counter): requests by method, status, outcome
//! - `kernel_request_duration_seconds` (histogram): dispatch latency
//! - `kernel_render_warnings_total` (counter): missing views and layouts
//!
//! # Design Decisions
//! - Recording is a no-op until an exporter is installed
//! - Labels stay low-cardinality (no paths)

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint started"),
        Err(e) => tracing::error!(
            address = %addr,
            error = %e,
            "Failed to install metrics exporter"
        ),
    }
}

/// Record a finished request.
pub fn record_request(method: &str, status: u16, outcome: &'static str, start: Instant) {
    counter!(
        "kernel_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "outcome" => outcome
    )
    .increment(1);
    histogram!("kernel_request_duration_seconds", "method" => method.to_string())
        .record(start.elapsed().as_secs_f64());
}

/// Record a soft rendering failure.
pub fn record_render_warning(kind: &'static str) {
    counter!("kernel_render_warnings_total", "kind" => kind).increment(1);
}
