//! Event dispatch: validation, admission, send and failure logging

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tokio::task::JoinHandle;
use uuid::{Uuid, Variant};

use crate::config::{ReportingConfig, Settings};
use crate::event::EventRecord;
use crate::metrics::DispatchMetrics;
use crate::ratelimit::StatusLogThrottle;

use super::error::DispatchFailure;
use super::gate::{ConcurrencyGate, GateError};
use super::policy::{LogDecision, LogPolicy};
use super::transport::{EventTransport, ReqwestTransport, TransportError, TransportResponse};

/// Statistics for the event dispatcher
#[derive(Debug, Default)]
pub struct DispatcherStats {
    /// Events that reached the send path
    pub attempted: AtomicU64,
    /// Events without an API key (reporting disabled)
    pub skipped: AtomicU64,
    /// Events rejected for a malformed chain id
    pub invalid_chain_id: AtomicU64,
    /// Events rejected by backpressure
    pub overloaded: AtomicU64,
    /// Events accepted by the collector
    pub sent: AtomicU64,
    /// Events that failed after admission
    pub failed: AtomicU64,
    /// Failure log lines written
    pub logs_emitted: AtomicU64,
    /// Failure log lines dropped by throttling
    pub logs_suppressed: AtomicU64,
}

impl DispatcherStats {
    pub fn snapshot(&self) -> DispatcherStatsSnapshot {
        DispatcherStatsSnapshot {
            attempted: self.attempted.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            invalid_chain_id: self.invalid_chain_id.load(Ordering::Relaxed),
            overloaded: self.overloaded.load(Ordering::Relaxed),
            sent: self.sent.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            logs_emitted: self.logs_emitted.load(Ordering::Relaxed),
            logs_suppressed: self.logs_suppressed.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of dispatcher statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatcherStatsSnapshot {
    pub attempted: u64,
    pub skipped: u64,
    pub invalid_chain_id: u64,
    pub overloaded: u64,
    pub sent: u64,
    pub failed: u64,
    pub logs_emitted: u64,
    pub logs_suppressed: u64,
}

/// True for a hyphenated RFC 4122 UUID of version 1 through 5
pub fn is_valid_chain_id(chain_id: &str) -> bool {
    if chain_id.len() != 36 {
        return false;
    }
    match Uuid::try_parse(chain_id) {
        Ok(uuid) => {
            matches!(uuid.get_version_num(), 1..=5) && uuid.get_variant() == Variant::RFC4122
        }
        Err(_) => false,
    }
}

/// Decode a collector reply.
///
/// A body that is not JSON is a decode failure regardless of status; a
/// decoded body with a non-2xx status is a request failure.
pub fn classify_response(response: TransportResponse) -> Result<Value, DispatchFailure> {
    let body: Value = match serde_json::from_str(&response.body) {
        Ok(body) => body,
        Err(_) => {
            return Err(DispatchFailure::Decode {
                status: response.status,
                status_text: response.status_text,
                body: response.body,
            })
        }
    };

    if !response.is_success() {
        return Err(DispatchFailure::Request {
            status: response.status,
            body,
        });
    }

    Ok(body)
}

/// Sends event records to the collector.
///
/// Dispatch never fails from the caller's point of view: every failure is
/// classified, logged according to [`LogPolicy`], and swallowed.
///
/// The collector URL and the debug flag come from the [`ReportingConfig`]
/// given at construction and are not re-read per event. Build a new
/// dispatcher over the same gate and throttle to change them.
pub struct EventDispatcher {
    transport: Arc<dyn EventTransport>,
    gate: Arc<ConcurrencyGate>,
    policy: LogPolicy,
    reporting: ReportingConfig,
    stats: DispatcherStats,
}

impl EventDispatcher {
    /// Create a dispatcher over shared gate and throttle instances
    pub fn new(
        transport: Arc<dyn EventTransport>,
        gate: Arc<ConcurrencyGate>,
        throttle: Arc<StatusLogThrottle>,
        reporting: ReportingConfig,
    ) -> Self {
        Self {
            transport,
            gate,
            policy: LogPolicy::new(throttle),
            reporting,
            stats: DispatcherStats::default(),
        }
    }

    /// Create a dispatcher with an HTTP transport from settings
    pub fn from_settings(settings: &Settings) -> Result<Self, TransportError> {
        let transport = ReqwestTransport::from_config(&settings.dispatch)?;
        let gate = ConcurrencyGate::new(
            settings.dispatch.concurrency_limit,
            settings.dispatch.max_pending,
        );

        tracing::info!(
            url = %settings.reporting.event_url(),
            concurrency_limit = settings.dispatch.concurrency_limit,
            max_pending = settings.dispatch.max_pending,
            "Creating event dispatcher"
        );

        Ok(Self::new(
            Arc::new(transport),
            Arc::new(gate),
            Arc::new(StatusLogThrottle::new()),
            settings.reporting.clone(),
        ))
    }

    /// The admission gate shared by all dispatches
    pub fn gate(&self) -> &Arc<ConcurrencyGate> {
        &self.gate
    }

    /// Get dispatcher statistics
    pub fn stats(&self) -> DispatcherStatsSnapshot {
        self.stats.snapshot()
    }

    /// Send one event.
    ///
    /// Returns the collector's decoded reply, or `None` when nothing was sent
    /// or the send failed.
    #[tracing::instrument(
        name = "dispatcher.dispatch",
        skip(self, event),
        fields(chain_id = ?event.chain_id, api_name = ?event.api_name)
    )]
    pub async fn dispatch(&self, event: &EventRecord) -> Option<Value> {
        if event.api_key.is_none() {
            tracing::debug!("No API key, reporting disabled");
            self.stats.skipped.fetch_add(1, Ordering::Relaxed);
            DispatchMetrics::record_outcome("skipped");
            return None;
        }

        if let Some(chain_id) = &event.chain_id {
            if !is_valid_chain_id(chain_id) {
                tracing::error!(chain_id = %chain_id, "chainId is not a valid UUID");
                self.stats.invalid_chain_id.fetch_add(1, Ordering::Relaxed);
                DispatchMetrics::record_outcome("invalid_chain_id");
                return None;
            }
        }

        self.stats.attempted.fetch_add(1, Ordering::Relaxed);

        let outcome = self.send(event).await;
        DispatchMetrics::record_gate(self.gate.queue_depth(), self.gate.in_flight());

        match outcome {
            Ok(reply) => {
                self.stats.sent.fetch_add(1, Ordering::Relaxed);
                DispatchMetrics::record_outcome("sent");
                Some(reply)
            }
            Err(failure) => {
                self.handle_failure(&failure);
                None
            }
        }
    }

    /// Dispatch on a background task, for callers that do not wait for the report
    pub fn spawn_dispatch(self: &Arc<Self>, event: EventRecord) -> JoinHandle<Option<Value>> {
        let dispatcher = self.clone();
        tokio::spawn(async move { dispatcher.dispatch(&event).await })
    }

    async fn send(&self, event: &EventRecord) -> Result<Value, DispatchFailure> {
        let body = serde_json::to_string(event)?;
        let url = self.reporting.event_url();

        let permit = self.gate.admit().await.map_err(|e| match e {
            GateError::Overloaded { max_pending } => DispatchFailure::Overloaded { max_pending },
            GateError::Closed => DispatchFailure::Closed,
        })?;
        DispatchMetrics::record_gate(self.gate.queue_depth(), self.gate.in_flight());

        let response = self.transport.post_json(&url, body).await;
        drop(permit);

        classify_response(response?)
    }

    fn handle_failure(&self, failure: &DispatchFailure) {
        let status = failure.status();

        if matches!(failure, DispatchFailure::Overloaded { .. }) {
            self.stats.overloaded.fetch_add(1, Ordering::Relaxed);
        } else {
            self.stats.failed.fetch_add(1, Ordering::Relaxed);
        }
        DispatchMetrics::record_outcome(failure.kind());

        match self.policy.decide(status, self.reporting.debug) {
            LogDecision::Emit => {
                self.stats.logs_emitted.fetch_add(1, Ordering::Relaxed);
                tracing::error!(status, error = %failure, "Failed to send event to collector");
            }
            LogDecision::Suppress => {
                self.stats.logs_suppressed.fetch_add(1, Ordering::Relaxed);
                DispatchMetrics::record_log_suppressed(status);
            }
            LogDecision::Skip => {
                tracing::trace!(status, error = %failure, "Event dispatch failed");
            }
        }
    }
}
