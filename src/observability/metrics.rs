//! Metrics collection and exposition.
//!
//! # Metrics
//! - `spineml_handshakes_total` (counter): handshakes by outcome
//! - `spineml_batches_total` (counter): cycles moved, by direction
//! - `spineml_values_total` (counter): values moved, by direction
//! - `spineml_sessions_ended_total` (counter): session ends by outcome
//! - `spineml_active_connections` (gauge): live stream workers

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::protocol::Direction;

/// Install the Prometheus recorder and its HTTP listener.
///
/// Must be called from within a tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_handshake(outcome: &'static str) {
    metrics::counter!("spineml_handshakes_total", "outcome" => outcome).increment(1);
}

pub fn record_batch(direction: Direction, values: usize) {
    metrics::counter!("spineml_batches_total", "direction" => direction.as_str()).increment(1);
    metrics::counter!("spineml_values_total", "direction" => direction.as_str())
        .increment(values as u64);
}

pub fn record_session_end(outcome: &'static str) {
    metrics::counter!("spineml_sessions_ended_total", "outcome" => outcome).increment(1);
}

pub fn set_active_connections(count: u64) {
    metrics::gauge!("spineml_active_connections").set(count as f64);
}
