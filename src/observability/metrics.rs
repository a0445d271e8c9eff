//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): inbound requests by method, status
//! - `gateway_request_duration_seconds` (histogram): time to response head
//! - `gateway_upstream_errors_total` (counter): transport failures by kind
//! - `gateway_preflight_total` (counter): answered `OPTIONS` requests
//! - `realtime_frames_total` (counter): socket frames by outcome
//! - `realtime_reconnects_total` (counter): scheduled reconnect attempts
//! - `realtime_connection_state` (gauge): 1 while connected, 0 otherwise
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op, so tests need no setup
//! - Labels are low-cardinality (method, status, kind), never paths

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => {
            describe_metrics();
            tracing::info!(address = %addr, "Metrics endpoint listening");
        }
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

fn describe_metrics() {
    describe_counter!("gateway_requests_total", "Inbound requests by method and status");
    describe_histogram!(
        "gateway_request_duration_seconds",
        "Time from request arrival to response head"
    );
    describe_counter!(
        "gateway_upstream_errors_total",
        "Upstream transport failures by kind"
    );
    describe_counter!("gateway_preflight_total", "Preflight requests answered locally");
    describe_counter!("realtime_frames_total", "Socket frames by outcome");
    describe_counter!("realtime_reconnects_total", "Reconnect attempts scheduled");
    describe_gauge!("realtime_connection_state", "1 while the socket is open");
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    counter!(
        "gateway_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("gateway_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_upstream_error(kind: &'static str) {
    counter!("gateway_upstream_errors_total", "kind" => kind).increment(1);
}

pub fn record_preflight() {
    counter!("gateway_preflight_total").increment(1);
}

pub fn record_frame(outcome: &'static str) {
    counter!("realtime_frames_total", "outcome" => outcome).increment(1);
}

pub fn record_reconnect() {
    counter!("realtime_reconnects_total").increment(1);
}

pub fn record_connection_state(connected: bool) {
    gauge!("realtime_connection_state").set(if connected { 1.0 } else { 0.0 });
}
