//! Prometheus metrics for event reporting.
//!
//! - Dispatch outcomes (sent, failed by kind, skipped)
//! - Gate occupancy (queue depth, in-flight sends)
//! - Failure log throttling

use lazy_static::lazy_static;
use prometheus::{
    register_int_counter_vec, register_int_gauge, Encoder, IntCounterVec, IntGauge, TextEncoder,
};

/// Prefix for all metrics
const METRIC_PREFIX: &str = "promptline";

lazy_static! {
    /// Dispatch outcomes by label
    pub static ref EVENTS_DISPATCHED_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_events_dispatched_total", METRIC_PREFIX),
        "Total event dispatch attempts by outcome",
        &["outcome"]
    ).unwrap();

    /// Sends waiting for a gate slot
    pub static ref DISPATCH_QUEUE_DEPTH: IntGauge = register_int_gauge!(
        format!("{}_dispatch_queue_depth", METRIC_PREFIX),
        "Number of event sends waiting for a concurrency slot"
    ).unwrap();

    /// Sends holding a gate slot
    pub static ref DISPATCH_IN_FLIGHT: IntGauge = register_int_gauge!(
        format!("{}_dispatch_in_flight", METRIC_PREFIX),
        "Number of event sends in flight"
    ).unwrap();

    /// Failure log lines dropped by the per-status throttle
    pub static ref FAILURE_LOGS_SUPPRESSED_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_failure_logs_suppressed_total", METRIC_PREFIX),
        "Total failure log lines suppressed by throttling",
        &["status"]
    ).unwrap();
}

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer).unwrap_or_default())
}

/// Helper struct for recording dispatch metrics
pub struct DispatchMetrics;

impl DispatchMetrics {
    pub fn record_outcome(outcome: &str) {
        EVENTS_DISPATCHED_TOTAL.with_label_values(&[outcome]).inc();
    }

    pub fn record_gate(queue_depth: usize, in_flight: usize) {
        DISPATCH_QUEUE_DEPTH.set(queue_depth as i64);
        DISPATCH_IN_FLIGHT.set(in_flight as i64);
    }

    pub fn record_log_suppressed(status: u16) {
        let status = status.to_string();
        FAILURE_LOGS_SUPPRESSED_TOTAL
            .with_label_values(&[status.as_str()])
            .inc();
    }
}
