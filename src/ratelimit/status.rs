//! Per-status-code throttling of failure log lines

use std::collections::HashMap;

use super::token_bucket::TokenBucket;

/// Status codes whose failure logs are throttled by default
pub const DEFAULT_THROTTLED_STATUSES: [u16; 2] = [429, 499];

/// Registry of independent token buckets keyed by HTTP status code.
///
/// Each registered status gets its own bucket; statuses without a bucket are
/// never throttled.
#[derive(Debug)]
pub struct StatusLogThrottle {
    buckets: HashMap<u16, TokenBucket>,
}

impl StatusLogThrottle {
    /// One log line per second for 429 and 499
    pub fn new() -> Self {
        Self::with_statuses(&DEFAULT_THROTTLED_STATUSES, 1, 1)
    }

    /// Throttle each of `statuses` with its own bucket
    pub fn with_statuses(statuses: &[u16], capacity: u32, refill_per_second: u32) -> Self {
        let buckets = statuses
            .iter()
            .map(|&status| (status, TokenBucket::new(capacity, refill_per_second)))
            .collect();
        Self { buckets }
    }

    /// Registry built from explicit buckets
    pub fn from_buckets(buckets: impl IntoIterator<Item = (u16, TokenBucket)>) -> Self {
        Self {
            buckets: buckets.into_iter().collect(),
        }
    }

    /// True when `status` has a registered bucket
    pub fn is_throttled(&self, status: u16) -> bool {
        self.buckets.contains_key(&status)
    }

    /// Take a token for `status`.
    ///
    /// Returns `None` when the status is not registered.
    pub fn try_acquire(&self, status: u16) -> Option<bool> {
        self.buckets.get(&status).map(TokenBucket::try_consume)
    }

    /// Same as [`try_acquire`](Self::try_acquire) at an explicit time
    pub fn try_acquire_at(&self, status: u16, now_ms: i64) -> Option<bool> {
        self.buckets
            .get(&status)
            .map(|bucket| bucket.try_consume_at(1, now_ms))
    }
}

impl Default for StatusLogThrottle {
    fn default() -> Self {
        Self::new()
    }
}
