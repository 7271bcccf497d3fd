//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define request metrics (count, latency, failures)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `correlation_requests_total` (counter): requests by method, status, id_source
//! - `correlation_request_duration_seconds` (histogram): latency distribution
//! - `correlation_request_failures_total` (counter): inner service errors
//!
//! # Design Decisions
//! - `id_source` label shows how much traffic arrives already correlated
//! - Recording without an installed exporter is a no-op
//! - Methods outside the standard set share the `other` label so callers
//!   cannot grow the series count with made-up verbs

use std::net::SocketAddr;
use std::time::Duration;

use axum::http::Method;
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Bounded label value for a request method.
pub fn method_label(method: &Method) -> &'static str {
    match *method {
        Method::GET => "GET",
        Method::POST => "POST",
        Method::PUT => "PUT",
        Method::PATCH => "PATCH",
        Method::DELETE => "DELETE",
        Method::HEAD => "HEAD",
        Method::OPTIONS => "OPTIONS",
        Method::CONNECT => "CONNECT",
        Method::TRACE => "TRACE",
        _ => "other",
    }
}

/// Record a completed request.
pub fn record_request(method: &Method, status: u16, id_source: &'static str, duration: Duration) {
    let method = method_label(method);
    let status = status.to_string();
    metrics::counter!(
        "correlation_requests_total",
        "method" => method,
        "status" => status.clone(),
        "id_source" => id_source
    )
    .increment(1);
    metrics::histogram!(
        "correlation_request_duration_seconds",
        "method" => method,
        "status" => status
    )
    .record(duration.as_secs_f64());
}

/// Record a request whose inner service returned an error instead of a response.
pub fn record_failure(method: &Method, id_source: &'static str) {
    metrics::counter!(
        "correlation_request_failures_total",
        "method" => method_label(method),
        "id_source" => id_source
    )
    .increment(1);
}
