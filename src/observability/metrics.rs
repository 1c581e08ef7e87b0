//! Metrics collection and exposition.
//!
//! # Metrics
//! - `relay_transactions_total` (counter): submissions by call, outcome
//! - `relay_read_failures_total` (counter): swallowed read failures by op
//! - `relay_faucet_claims_total` (counter): claims by outcome
//! - `relay_swaps_total` (counter): swaps by outcome
//! - `relay_http_requests_total` (counter): requests by method, status
//! - `relay_http_request_duration_seconds` (histogram): request latency
//! - `relay_rpc_health` (gauge): 1=reachable, 0=unreachable

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

/// Install the Prometheus exporter with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_transaction(call: &'static str, outcome: &'static str) {
    counter!("relay_transactions_total", "call" => call, "outcome" => outcome).increment(1);
}

pub fn record_read_failure(op: &'static str) {
    counter!("relay_read_failures_total", "op" => op).increment(1);
}

pub fn record_faucet_claim(outcome: &'static str) {
    counter!("relay_faucet_claims_total", "outcome" => outcome).increment(1);
}

pub fn record_swap(outcome: &'static str) {
    counter!("relay_swaps_total", "outcome" => outcome).increment(1);
}

pub fn record_request(method: &str, status: u16, start_time: Instant) {
    counter!(
        "relay_http_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("relay_http_request_duration_seconds", "method" => method.to_string())
        .record(start_time.elapsed().as_secs_f64());
}

pub fn record_rpc_health(healthy: bool) {
    gauge!("relay_rpc_health").set(if healthy { 1.0 } else { 0.0 });
}
