//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define breaker metrics (calls, latency, state changes, learning updates)
//! - Expose Prometheus-compatible metrics endpoint
//! - Track per-source (static vs adaptive) metrics
//!
//! # Metrics
//! - `breaker_calls_total` (counter): calls by source, outcome
//! - `breaker_call_duration_seconds` (histogram): call latency by source
//! - `breaker_state_changes_total` (counter): transitions by source, state
//! - `breaker_q_updates_total` (counter): Bellman updates applied
//! - `breaker_active_path` (gauge): 0=primary, 1=backup
//!
//! # Design Decisions
//! - Metrics go through the `metrics` facade; without an installed recorder
//!   every call is a no-op, which keeps tests free of global setup

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::learning::ServicePath;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_call(source: &str, outcome: &'static str, duration: Duration) {
    metrics::counter!("breaker_calls_total", "source" => source.to_string(), "outcome" => outcome)
        .increment(1);
    metrics::histogram!("breaker_call_duration_seconds", "source" => source.to_string())
        .record(duration.as_secs_f64());
}

pub fn record_state_change(source: &str, new_state: &str) {
    metrics::counter!(
        "breaker_state_changes_total",
        "source" => source.to_string(),
        "state" => new_state.to_string()
    )
    .increment(1);
}

pub fn record_q_update() {
    metrics::counter!("breaker_q_updates_total").increment(1);
}

pub fn record_active_path(path: ServicePath) {
    let value = match path {
        ServicePath::Primary => 0.0,
        ServicePath::Backup => 1.0,
    };
    metrics::gauge!("breaker_active_path").set(value);
}
