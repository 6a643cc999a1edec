//! Metrics collection and exposition.
//!
//! # Metrics
//! - `conductor_transactions_total` (counter): terminal outcomes by status
//! - `conductor_approvals_total` (counter): approvals submitted by token
//! - `conductor_balance_polls_total` (counter): poll results by chain
//! - `conductor_module_runs_total` (counter): module runs by kind, outcome
//! - `conductor_identities_total` (counter): identities processed by outcome
//!
//! Recording is a no-op until a recorder is installed.

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder with an HTTP scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics recorder"),
    }
}

pub fn record_tx_outcome(status: &'static str) {
    metrics::counter!("conductor_transactions_total", "status" => status).increment(1);
}

pub fn record_approval(token: &'static str) {
    metrics::counter!("conductor_approvals_total", "token" => token).increment(1);
}

pub fn record_balance_poll(chain: &'static str, outcome: &'static str) {
    metrics::counter!("conductor_balance_polls_total", "chain" => chain, "outcome" => outcome).increment(1);
}

pub fn record_module_run(kind: &'static str, outcome: &'static str) {
    metrics::counter!("conductor_module_runs_total", "kind" => kind, "outcome" => outcome).increment(1);
}

pub fn record_identity(outcome: &'static str) {
    metrics::counter!("conductor_identities_total", "outcome" => outcome).increment(1);
}
