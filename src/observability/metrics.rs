//! Metrics collection and exposition.
//!
//! # Metrics
//! - `dns_discovery_rounds_total` (counter): discovery rounds by outcome
//! - `dns_discovery_peers` (gauge): peers returned by the last round
//! - `dns_discovery_resolution_seconds` (histogram): DNS lookup latency
//! - `dns_discovery_config_reloads_total` (counter): reloads by result
//! - `dns_discovery_config_changes_total` (counter): changed keys by kind
//!
//! Recording is a no-op until a recorder is installed.

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its HTTP scrape endpoint.
///
/// Must be called from inside a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_round(outcome: &'static str, peers: usize) {
    metrics::counter!("dns_discovery_rounds_total", "outcome" => outcome).increment(1);
    metrics::gauge!("dns_discovery_peers").set(peers as f64);
}

pub fn record_resolution_duration(elapsed: Duration) {
    metrics::histogram!("dns_discovery_resolution_seconds").record(elapsed.as_secs_f64());
}

pub fn record_reload(result: &'static str) {
    metrics::counter!("dns_discovery_config_reloads_total", "result" => result).increment(1);
}

pub fn record_config_change(kind: &'static str) {
    metrics::counter!("dns_discovery_config_changes_total", "kind" => kind).increment(1);
}
