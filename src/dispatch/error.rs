//! Dispatch failure types

use serde_json::Value;
use thiserror::Error;

use super::transport::TransportError;

/// Status reported for the synthetic backpressure failure
pub const OVERLOADED_STATUS: u16 = 429;

/// Why an event was not delivered.
///
/// Never returned to dispatch callers; only classified and possibly logged.
#[derive(Debug, Error)]
pub enum DispatchFailure {
    #[error("too many pending requests ({max_pending})")]
    Overloaded { max_pending: usize },

    #[error("Unparseable response ({status} {status_text}): {body}")]
    Decode {
        status: u16,
        status_text: String,
        body: String,
    },

    #[error("Failed to send event: {body}")]
    Request { status: u16, body: Value },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Failed to serialize event: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("dispatcher is shut down")]
    Closed,
}

impl DispatchFailure {
    /// HTTP status captured for this failure, 0 when none was obtained
    pub fn status(&self) -> u16 {
        match self {
            DispatchFailure::Overloaded { .. } => OVERLOADED_STATUS,
            DispatchFailure::Decode { status, .. } => *status,
            DispatchFailure::Request { status, .. } => *status,
            DispatchFailure::Transport(_) | DispatchFailure::Serialize(_) | DispatchFailure::Closed => 0,
        }
    }

    /// Short label for metrics
    pub fn kind(&self) -> &'static str {
        match self {
            DispatchFailure::Overloaded { .. } => "overloaded",
            DispatchFailure::Decode { .. } => "decode",
            DispatchFailure::Request { .. } => "request",
            DispatchFailure::Transport(_) => "transport",
            DispatchFailure::Serialize(_) => "serialize",
            DispatchFailure::Closed => "closed",
        }
    }
}
