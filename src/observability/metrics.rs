//! Metrics collection and exposition.
//!
//! # Metrics
//! - `image_proxy_requests_total` (counter): requests by outcome and status
//! - `image_proxy_request_duration_seconds` (histogram): time to first byte
//! - `image_proxy_redirects_total` (counter): validated redirects followed
//! - `image_proxy_relay_bytes_total` (counter): body bytes sent to clients
//! - `image_proxy_relay_aborted_total` (counter): relays ended early, by reason
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed
//! - Label values are static strings; URLs and hosts are never labels

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// Record a finished request. `outcome` is "ok" or an error kind.
pub fn record_request(outcome: &'static str, status: u16, start: Instant) {
    ::metrics::counter!(
        "image_proxy_requests_total",
        "outcome" => outcome,
        "status" => status.to_string()
    )
    .increment(1);
    ::metrics::histogram!("image_proxy_request_duration_seconds", "outcome" => outcome)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_redirect() {
    ::metrics::counter!("image_proxy_redirects_total").increment(1);
}

/// Record the end of a relay. `aborted` is `None` for a complete body.
pub fn record_relay(bytes: u64, aborted: Option<&'static str>) {
    ::metrics::counter!("image_proxy_relay_bytes_total").increment(bytes);
    if let Some(reason) = aborted {
        ::metrics::counter!("image_proxy_relay_aborted_total", "reason" => reason).increment(1);
    }
}
