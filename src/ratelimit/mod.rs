//! Rate limiting module using Token Bucket algorithm.
//!
//! The bucket is used to throttle repeated failure log lines per HTTP status
//! code so a collector under load cannot flood the caller's logs.

mod status;
mod token_bucket;

pub use status::{StatusLogThrottle, DEFAULT_THROTTLED_STATUSES};
pub use token_bucket::TokenBucket;
