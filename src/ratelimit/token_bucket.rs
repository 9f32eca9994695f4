//! Token Bucket algorithm implementation

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::SystemTime;

/// Tokens are stored scaled by this factor so partial refills are not lost
const SCALE: u64 = 1000;

/// Token Bucket for rate limiting.
///
/// Uses atomic operations for lock-free concurrent access.
/// Tokens are refilled on wall-clock time at a constant rate up to the
/// bucket capacity, independent of how often the bucket is checked.
#[derive(Debug)]
pub struct TokenBucket {
    /// Current number of tokens (scaled by 1000 for precision)
    tokens: AtomicU64,
    /// Last refill timestamp (Unix milliseconds)
    last_refill: AtomicI64,
    /// Maximum bucket capacity
    capacity: u32,
    /// Tokens added per second
    refill_rate: u32,
}

impl TokenBucket {
    /// Create a new, full token bucket
    pub fn new(capacity: u32, refill_rate: u32) -> Self {
        Self::starting_at(capacity, refill_rate, Self::now_millis())
    }

    /// Create a full bucket whose refill clock starts at `now_ms`
    pub fn starting_at(capacity: u32, refill_rate: u32, now_ms: i64) -> Self {
        Self {
            tokens: AtomicU64::new(capacity as u64 * SCALE),
            last_refill: AtomicI64::new(now_ms),
            capacity,
            refill_rate,
        }
    }

    /// Get current time in milliseconds
    pub fn now_millis() -> i64 {
        SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as i64
    }

    /// Try to consume one token from the bucket.
    /// Returns true if a token was available, false otherwise.
    pub fn try_consume(&self) -> bool {
        self.try_consume_at(1, Self::now_millis())
    }

    /// Try to consume n tokens as of `now_ms`.
    ///
    /// The check and the decrement are a single atomic update, so
    /// concurrent callers can never take more tokens than were earned.
    pub fn try_consume_at(&self, n: u32, now_ms: i64) -> bool {
        self.refill(now_ms);

        let wanted = n as u64 * SCALE;
        self.tokens
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                current.checked_sub(wanted)
            })
            .is_ok()
    }

    /// Credit tokens for the time elapsed since the last refill.
    fn refill(&self, now_ms: i64) {
        let max = self.capacity as u64 * SCALE;
        loop {
            let last = self.last_refill.load(Ordering::Acquire);
            let elapsed_ms = (now_ms - last).max(0) as u64;
            // refill_rate tokens/sec == refill_rate scaled tokens/ms
            let earned = elapsed_ms * self.refill_rate as u64;
            if earned == 0 {
                return;
            }

            // Claim the elapsed window first so it is only credited once
            if self
                .last_refill
                .compare_exchange_weak(last, now_ms, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                let _ = self
                    .tokens
                    .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                        Some((current + earned).min(max))
                    });
                return;
            }
        }
    }
}
