//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): HTTP requests by method, status
//! - `gateway_request_duration_seconds` (histogram): handler latency
//! - `gateway_active_connections` (gauge): open WebSocket sessions
//! - `gateway_registered_connections` (gauge): registry size
//! - `gateway_authorizations_total` (counter): by outcome
//! - `gateway_relay_total` (counter): by direction, outcome
//!
//! Recording without an installed exporter is a no-op, so tests and
//! embedders pay nothing.

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

/// Install the Prometheus exporter with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    metrics::counter!(
        "gateway_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("gateway_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn connection_opened() {
    metrics::gauge!("gateway_active_connections").increment(1.0);
}

pub fn connection_closed() {
    metrics::gauge!("gateway_active_connections").decrement(1.0);
}

pub fn set_registered_connections(count: usize) {
    metrics::gauge!("gateway_registered_connections").set(count as f64);
}

pub fn record_authorization(outcome: &'static str) {
    metrics::counter!("gateway_authorizations_total", "outcome" => outcome).increment(1);
}

pub fn record_relay(direction: &'static str, outcome: &'static str) {
    metrics::counter!(
        "gateway_relay_total",
        "direction" => direction,
        "outcome" => outcome
    )
    .increment(1);
}
