//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by endpoint, status, outcome
//! - `gateway_request_duration_seconds` (histogram): handler latency by endpoint
//! - `gateway_upstream_requests_total` (counter): third-party calls by service, outcome
//! - `gateway_upstream_duration_seconds` (histogram): third-party latency by service
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder (tests, CLI) every call is a no-op
//! - Prometheus exporter runs its own listener when enabled in config

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// Record a handled terminal request.
pub fn record_request(endpoint: &'static str, status: u16, outcome: &'static str, start: Instant) {
    metrics::counter!(
        "gateway_requests_total",
        "endpoint" => endpoint,
        "status" => status.to_string(),
        "outcome" => outcome
    )
    .increment(1);
    metrics::histogram!("gateway_request_duration_seconds", "endpoint" => endpoint)
        .record(start.elapsed().as_secs_f64());
}

/// Record a call to a third-party service.
pub fn record_upstream(service: &'static str, success: bool, start: Instant) {
    let outcome = if success { "success" } else { "failure" };
    metrics::counter!(
        "gateway_upstream_requests_total",
        "service" => service,
        "outcome" => outcome
    )
    .increment(1);
    metrics::histogram!("gateway_upstream_duration_seconds", "service" => service)
        .record(start.elapsed().as_secs_f64());
}
