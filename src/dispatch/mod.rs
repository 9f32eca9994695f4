//! Event dispatch pipeline.
//!
//! Each dispatch runs the same sequence:
//! 1. Validate: no API key means reporting is off; a malformed chain id is
//!    logged and dropped.
//! 2. Admit through the [`ConcurrencyGate`]; a full wait queue fails fast
//!    with a synthetic 429 instead of queuing.
//! 3. Send through the [`EventTransport`].
//! 4. Classify the reply (decode failure, request failure, success).
//! 5. Apply the [`LogPolicy`] to failures and swallow them.

mod dispatcher;
mod error;
mod gate;
mod policy;
mod transport;

pub use dispatcher::{
    classify_response, is_valid_chain_id, DispatcherStats, DispatcherStatsSnapshot, EventDispatcher,
};
pub use error::{DispatchFailure, OVERLOADED_STATUS};
pub use gate::{ConcurrencyGate, GateError, GatePermit};
pub use policy::{log_gate, LogDecision, LogGate, LogPolicy};
pub use transport::{EventTransport, ReqwestTransport, TransportError, TransportResponse};
