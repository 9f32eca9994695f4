//! Event records reported to the collector.

mod builder;
mod types;

pub use builder::EventBuilder;
pub use types::{CallOptions, EventRecord, EventSource};
