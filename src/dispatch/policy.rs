//! Failure logging policy
//!
//! Deciding whether a failure is logged is kept apart from the log call
//! itself so the policy can be exercised without a logging sink.

use std::sync::Arc;

use crate::ratelimit::StatusLogThrottle;

/// Which rule governs a failure with a given status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogGate {
    /// Log unconditionally
    Always,
    /// Not an actionable client error
    Never,
    /// Log only if the status bucket has a token
    Throttled(u16),
}

/// Outcome of applying the policy to one failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogDecision {
    Emit,
    /// Policy never logs this status
    Skip,
    /// Throttled away
    Suppress,
}

/// Rule for `status`, without consuming any token.
///
/// Debug mode logs everything. Otherwise only 4xx statuses are logged
/// (status 0 and 5xx never are), throttled when the registry has a bucket
/// for the exact status.
pub fn log_gate(status: u16, debug: bool, throttle: &StatusLogThrottle) -> LogGate {
    if debug {
        return LogGate::Always;
    }
    if !(400..500).contains(&status) {
        return LogGate::Never;
    }
    if throttle.is_throttled(status) {
        LogGate::Throttled(status)
    } else {
        LogGate::Always
    }
}

/// Applies [`log_gate`] and the per-status token buckets
#[derive(Debug, Clone)]
pub struct LogPolicy {
    throttle: Arc<StatusLogThrottle>,
}

impl LogPolicy {
    pub fn new(throttle: Arc<StatusLogThrottle>) -> Self {
        Self { throttle }
    }

    /// Decide for one failure, consuming a token when throttled
    pub fn decide(&self, status: u16, debug: bool) -> LogDecision {
        match log_gate(status, debug, &self.throttle) {
            LogGate::Always => LogDecision::Emit,
            LogGate::Never => LogDecision::Skip,
            LogGate::Throttled(status) => match self.throttle.try_acquire(status) {
                Some(false) => LogDecision::Suppress,
                _ => LogDecision::Emit,
            },
        }
    }
}

impl Default for LogPolicy {
    fn default() -> Self {
        Self::new(Arc::new(StatusLogThrottle::new()))
    }
}
