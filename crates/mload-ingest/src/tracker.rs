//! Completion tracking for submitted records
//!
//! A counting latch: the distributor adds one per record before submitting
//! it, a worker marks one done when the record's insert has terminated, and
//! the orchestrator waits for the count to fall back to zero.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::error;

#[derive(Debug, Default)]
struct Inner {
    pending: AtomicUsize,
    drained: Notify,
}

/// Cheaply cloneable handle to a shared in-flight counter.
#[derive(Debug, Clone, Default)]
pub struct CompletionTracker {
    inner: Arc<Inner>,
}

impl CompletionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `n` more records as in flight.
    pub fn add(&self, n: usize) {
        self.inner.pending.fetch_add(n, Ordering::AcqRel);
    }

    /// Mark one record as finished.
    ///
    /// A call with nothing pending is logged and ignored.
    pub fn done(&self) {
        let previous = self
            .inner
            .pending
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));

        match previous {
            Ok(1) => self.inner.drained.notify_waiters(),
            Ok(_) => {},
            Err(_) => error!("Completion tracker marked done with nothing pending"),
        }
    }

    /// Marks one record done when dropped, including during unwinding.
    pub fn done_on_drop(&self) -> DoneGuard<'_> {
        DoneGuard { tracker: self }
    }

    /// Records still in flight
    pub fn pending(&self) -> usize {
        self.inner.pending.load(Ordering::Acquire)
    }

    /// Wait until nothing is pending. Returns at once if the count is zero.
    pub async fn wait(&self) {
        loop {
            let drained = self.inner.drained.notified();
            tokio::pin!(drained);
            // Register before checking so a concurrent final `done` is not missed.
            drained.as_mut().enable();

            if self.pending() == 0 {
                return;
            }

            drained.await;
        }
    }
}

/// See [`CompletionTracker::done_on_drop`]
#[must_use]
pub struct DoneGuard<'a> {
    tracker: &'a CompletionTracker,
}

impl Drop for DoneGuard<'_> {
    fn drop(&mut self) {
        self.tracker.done();
    }
}
