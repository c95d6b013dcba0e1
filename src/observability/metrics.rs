//! Metrics collection.
//!
//! # Metrics
//! - `settlement_rpc_connections_total` (counter): connections opened, by network and result
//! - `settlement_signing_requests_total` (counter): signing attempts, by outcome
//! - `settlement_transactions_total` (counter): broadcast results, by network and status
//! - `settlement_receipt_wait_seconds` (histogram): time from submission to receipt
//! - `settlement_deposit_windows_total` (counter): log windows scanned, by network
//! - `settlement_deposits_found_total` (counter): deposits decoded, by network

use std::time::Duration;

/// Record the result of opening a chain connection.
pub fn record_connection(network: &str, ok: bool) {
    let result = if ok { "ok" } else { "error" };
    metrics::counter!(
        "settlement_rpc_connections_total",
        "network" => network.to_string(),
        "result" => result
    )
    .increment(1);
}

/// Record a signing attempt outcome ("signed", "mfa_required", "error").
pub fn record_signing(outcome: &'static str) {
    metrics::counter!("settlement_signing_requests_total", "outcome" => outcome).increment(1);
}

/// Record a broadcast result ("success", "failed", "timeout").
pub fn record_transaction(network: &str, status: &'static str) {
    metrics::counter!(
        "settlement_transactions_total",
        "network" => network.to_string(),
        "status" => status
    )
    .increment(1);
}

/// Record how long a receipt took to show up.
pub fn record_receipt_wait(network: &str, elapsed: Duration) {
    metrics::histogram!(
        "settlement_receipt_wait_seconds",
        "network" => network.to_string()
    )
    .record(elapsed.as_secs_f64());
}

/// Record one scanned log window and the deposits it produced.
pub fn record_deposit_window(network: &str, deposits: usize) {
    metrics::counter!(
        "settlement_deposit_windows_total",
        "network" => network.to_string()
    )
    .increment(1);
    metrics::counter!(
        "settlement_deposits_found_total",
        "network" => network.to_string()
    )
    .increment(deposits as u64);
}
