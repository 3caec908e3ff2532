//! Batch scheduler: the dispatch trigger for one logical request
//!
//! Loaders register themselves here the moment they take on a pending key.
//! The surrounding execution engine calls [`BatchScheduler::dispatch`] at
//! the boundary of each synchronous resolution burst, which fires every
//! dirty loader's batch fetch exactly once and clears the set. Loads issued
//! while a tick is running (nested, dependent fields) land in the next tick.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;
use uuid::Uuid;

/// Identity of a loader instance, used to keep registration idempotent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct LoaderId(Uuid);

impl LoaderId {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

/// What the scheduler needs from a registered loader. Implemented by
/// [`Loader`](crate::Loader); not part of the public API, so resolvers can
/// never fire a dispatch directly.
#[async_trait]
pub(crate) trait DispatchTarget: Send + Sync {
    fn loader_id(&self) -> LoaderId;

    /// Fetch and resolve everything queued on this loader.
    async fn dispatch(&self);

    /// Fail everything queued on this loader with a cancellation error,
    /// issuing no fetch.
    fn discard_pending(&self);
}

/// Coalesces all loads requested within one resolution burst into a single
/// batch fetch per loader.
///
/// One scheduler serves one logical request; build it alongside the
/// request's loaders and drop them together. It is deliberately not a
/// process-wide singleton: sharing it across requests would let one
/// request's dispatch flush another's half-accumulated keys.
pub struct BatchScheduler {
    dirty: Mutex<Vec<Arc<dyn DispatchTarget>>>,
}

impl BatchScheduler {
    /// Loaders hold a handle back to their scheduler, so it is constructed
    /// behind an `Arc` from the start.
    pub fn new() -> Arc<Self> {
        Arc::new(Self { dirty: Mutex::new(Vec::new()) })
    }

    /// Mark a loader dirty for the current tick. Idempotent; first
    /// registration order is preserved so dispatch traces stay
    /// deterministic.
    pub(crate) fn register(&self, target: Arc<dyn DispatchTarget>) {
        let mut dirty = self.dirty.lock();
        if dirty.iter().any(|t| t.loader_id() == target.loader_id()) {
            return;
        }
        dirty.push(target);
    }

    /// Fire one tick: dispatch every dirty loader once, in registration
    /// order, and return how many fired.
    ///
    /// The dirty set is taken before any fetch runs, so loads triggered
    /// while resolving this tick re-register for the next one rather than
    /// being lost or double-processed.
    pub async fn dispatch(&self) -> usize {
        let batch = std::mem::take(&mut *self.dirty.lock());
        if batch.is_empty() {
            return 0;
        }

        debug!(loaders = batch.len(), "Dispatching tick");
        for target in &batch {
            target.dispatch().await;
        }
        batch.len()
    }

    /// Cancel the current tick: every load still queued fails with
    /// [`LoadError::Cancelled`](crate::LoadError::Cancelled) and zero
    /// fetches are issued. Returns how many loaders were discarded.
    ///
    /// Fetches already in flight from an earlier tick are not interrupted.
    pub fn cancel(&self) -> usize {
        let batch = std::mem::take(&mut *self.dirty.lock());
        for target in &batch {
            target.discard_pending();
        }
        batch.len()
    }

    /// Whether any loader has keys queued for the next tick.
    pub fn has_pending(&self) -> bool {
        !self.dirty.lock().is_empty()
    }

    /// Dispatch ticks until no loader re-registers, yielding between ticks
    /// so resolvers woken by one tick can queue keys for the next. Returns
    /// the number of ticks fired.
    ///
    /// Convenience for drivers without a finer-grained burst boundary;
    /// executors that do have one should call [`dispatch`](Self::dispatch)
    /// there instead.
    pub async fn run_until_idle(&self) -> usize {
        let mut ticks = 0;
        loop {
            // Let tasks resolved by the previous tick run and enqueue
            // their dependent loads before deciding we are idle.
            tokio::task::yield_now().await;
            if !self.has_pending() {
                break;
            }
            self.dispatch().await;
            ticks += 1;
        }
        ticks
    }
}

impl Drop for BatchScheduler {
    fn drop(&mut self) {
        // The request ended with keys still queued; fail their waiters
        // rather than leaving them dangling.
        for target in self.dirty.get_mut().drain(..) {
            target.discard_pending();
        }
    }
}
