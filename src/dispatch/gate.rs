//! Admission control for in-flight sends

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Gate admission error type
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GateError {
    #[error("too many pending requests ({max_pending})")]
    Overloaded { max_pending: usize },

    #[error("concurrency gate closed")]
    Closed,
}

/// Bounds the number of simultaneously running operations.
///
/// Callers beyond `capacity` wait in FIFO order. At most `max_pending`
/// callers may wait; further callers are rejected immediately instead of
/// growing the queue.
#[derive(Debug)]
pub struct ConcurrencyGate {
    semaphore: Arc<Semaphore>,
    capacity: usize,
    max_pending: usize,
    /// Callers waiting for a slot
    pending: AtomicUsize,
    /// Callers holding a slot
    in_flight: Arc<AtomicUsize>,
}

/// A held slot; released on drop
#[derive(Debug)]
pub struct GatePermit {
    _permit: OwnedSemaphorePermit,
    in_flight: Arc<AtomicUsize>,
}

impl Drop for GatePermit {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::AcqRel);
    }
}

/// A reserved place in the wait queue; released on drop, including when the
/// waiting future is cancelled
struct PendingSlot<'a>(&'a AtomicUsize);

impl Drop for PendingSlot<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

impl ConcurrencyGate {
    pub fn new(capacity: usize, max_pending: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
            max_pending,
            pending: AtomicUsize::new(0),
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn max_pending(&self) -> usize {
        self.max_pending
    }

    /// Number of callers waiting for a slot
    pub fn queue_depth(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    /// Number of callers currently holding a slot
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Wait for a slot.
    ///
    /// Fails with [`GateError::Overloaded`] without waiting when the queue is
    /// already `max_pending` deep.
    pub async fn admit(&self) -> Result<GatePermit, GateError> {
        // Free slot and nobody queued ahead of us
        if let Ok(permit) = self.semaphore.clone().try_acquire_owned() {
            return Ok(self.track(permit));
        }

        let slot = self.reserve_pending()?;
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| GateError::Closed)?;
        drop(slot);

        Ok(self.track(permit))
    }

    /// Run `operation` once a slot is available, releasing the slot when it
    /// completes
    pub async fn run<F, T>(&self, operation: F) -> Result<T, GateError>
    where
        F: Future<Output = T>,
    {
        let _permit = self.admit().await?;
        Ok(operation.await)
    }

    /// Stop admitting; current and future waiters fail with [`GateError::Closed`]
    pub fn close(&self) {
        self.semaphore.close();
    }

    fn reserve_pending(&self) -> Result<PendingSlot<'_>, GateError> {
        // Check and increment in one step so two callers cannot both take the last place
        self.pending
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |depth| {
                (depth < self.max_pending).then_some(depth + 1)
            })
            .map(|_| PendingSlot(&self.pending))
            .map_err(|_| GateError::Overloaded {
                max_pending: self.max_pending,
            })
    }

    fn track(&self, permit: OwnedSemaphorePermit) -> GatePermit {
        self.in_flight.fetch_add(1, Ordering::AcqRel);
        GatePermit {
            _permit: permit,
            in_flight: self.in_flight.clone(),
        }
    }
}
