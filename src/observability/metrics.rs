//! Metrics collection and exposition.
//!
//! # Metrics
//! - `supervisor_spawns_total` (counter): successful forks by slot
//! - `supervisor_spawn_failures_total` (counter): failed forks by slot
//! - `supervisor_reaps_total` (counter): reaped workers by slot
//! - `supervisor_liveness_errors_total` (counter): failed liveness queries
//! - `supervisor_workers_running` (gauge): slots currently Running
//!
//! Without an installed recorder every call here is a no-op.

use std::net::SocketAddr;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::worker::slot::SlotId;

/// Install the Prometheus recorder and its HTTP listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_spawn(slot: SlotId) {
    counter!("supervisor_spawns_total", "slot" => slot.to_string()).increment(1);
}

pub fn record_spawn_failure(slot: SlotId) {
    counter!("supervisor_spawn_failures_total", "slot" => slot.to_string()).increment(1);
}

pub fn record_reap(slot: SlotId) {
    counter!("supervisor_reaps_total", "slot" => slot.to_string()).increment(1);
}

pub fn record_liveness_error() {
    counter!("supervisor_liveness_errors_total").increment(1);
}

pub fn record_running(count: usize) {
    gauge!("supervisor_workers_running").set(count as f64);
}
