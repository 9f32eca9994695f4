// Supporting modules
pub mod config;
pub mod error;
pub mod metrics;
pub mod telemetry;

// Template resolution
pub mod messages;
pub mod template;

// Event reporting
pub mod dispatch;
pub mod event;
pub mod ratelimit;
