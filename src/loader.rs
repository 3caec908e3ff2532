//! Generic per-request loader: cache, dedup, and batch dispatch
//!
//! A `Loader` collects every key requested during one resolution burst,
//! hands the distinct set to its [`BatchFn`] in a single call when the
//! scheduler fires, then fans each result back out to all of its waiting
//! callers. Once a key has resolved it is served from the request cache and
//! never fetched again for the life of the loader.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use futures::channel::oneshot;
use parking_lot::Mutex;
use tracing::debug;

use crate::batch::BatchFn;
use crate::cache::RequestCache;
use crate::error::LoadError;
use crate::scheduler::{BatchScheduler, DispatchTarget, LoaderId};

/// What a single load ultimately resolves to: the value, a well-defined
/// "no matching record", or the dispatch-level failure.
type Outcome<V, E> = Result<Option<V>, LoadError<E>>;

type Waiter<V, E> = oneshot::Sender<Outcome<V, E>>;

struct LoaderState<K, V, E> {
    cache: RequestCache<K, V>,
    /// Keys queued for the next dispatch, in first-request order.
    pending: Vec<K>,
    /// Callers waiting on a key, covering both queued and in-flight keys.
    /// One entry per distinct key is what makes duplicate loads coalesce.
    waiters: HashMap<K, Vec<Waiter<V, E>>>,
    /// Keys snapshotted into a fetch that has not resolved yet. A late
    /// load for one of these joins the in-flight batch instead of queueing
    /// the key a second time.
    in_flight: HashSet<K>,
}

impl<K: Eq + Hash, V, E> LoaderState<K, V, E> {
    fn new() -> Self {
        Self {
            cache: RequestCache::new(),
            pending: Vec::new(),
            waiters: HashMap::new(),
            in_flight: HashSet::new(),
        }
    }
}

/// Per-request batching loader over an arbitrary [`BatchFn`].
///
/// Constructed behind an `Arc` so it can register itself with the
/// scheduler as keys arrive. Lives for exactly one logical request; the
/// cache has no invalidation, so reusing an instance across requests would
/// serve stale data.
pub struct Loader<K, F>
where
    K: Send + Sync + Hash + Eq + Clone + 'static,
    F: BatchFn<K>,
{
    name: &'static str,
    id: LoaderId,
    batch_fn: F,
    scheduler: Weak<BatchScheduler>,
    me: Weak<Loader<K, F>>,
    state: Mutex<LoaderState<K, F::Value, F::Error>>,
}

impl<K, F> Loader<K, F>
where
    K: Send + Sync + Hash + Eq + Clone + 'static,
    F: BatchFn<K>,
{
    /// Create a loader bound to `scheduler`. The name only shows up in
    /// trace output (e.g. `"authors"`).
    ///
    /// The loader keeps a weak handle to the scheduler: when the request's
    /// scheduler is gone, later loads fail with `Cancelled` instead of
    /// queueing keys nothing will ever dispatch.
    pub fn new(name: &'static str, batch_fn: F, scheduler: &Arc<BatchScheduler>) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            name,
            id: LoaderId::new(),
            batch_fn,
            scheduler: Arc::downgrade(scheduler),
            me: me.clone(),
            state: Mutex::new(LoaderState::new()),
        })
    }

    /// Load one value by key.
    ///
    /// Resolved keys return immediately from the cache without touching the
    /// scheduler. A key already queued or in flight attaches this caller to
    /// the existing batch. Otherwise the key is queued, the loader marks
    /// itself dirty with the scheduler, and the future resolves when the
    /// next tick fires.
    ///
    /// `Ok(None)` means the fetch ran and found no matching record.
    pub async fn load(&self, key: K) -> Outcome<F::Value, F::Error> {
        let rx = {
            let mut guard = self.state.lock();
            let state = &mut *guard;

            if let Some(outcome) = state.cache.get(&key) {
                return Ok(outcome.clone());
            }

            let (tx, rx) = oneshot::channel();
            match state.waiters.entry(key.clone()) {
                Entry::Occupied(mut entry) => entry.get_mut().push(tx),
                Entry::Vacant(entry) => {
                    let Some(scheduler) = self.scheduler.upgrade() else {
                        return Err(LoadError::Cancelled);
                    };
                    entry.insert(vec![tx]);
                    state.pending.push(key);
                    if let Some(me) = self.me.upgrade() {
                        scheduler.register(me);
                    }
                }
            }
            rx
        };

        match rx.await {
            Ok(outcome) => outcome,
            // Sender dropped without resolving: the request was torn down.
            Err(oneshot::Canceled) => Err(LoadError::Cancelled),
        }
    }

    /// Load many values at once. The output is positionally aligned with
    /// the input keys, duplicates included, whatever order the fetch
    /// returned them in.
    pub async fn load_many<I>(&self, keys: I) -> Result<Vec<Option<F::Value>>, LoadError<F::Error>>
    where
        I: IntoIterator<Item = K>,
    {
        futures::future::try_join_all(keys.into_iter().map(|key| self.load(key))).await
    }

    /// Number of keys resolved so far in this request.
    pub fn cached_len(&self) -> usize {
        self.state.lock().cache.len()
    }

    /// Whether `key` has already been resolved (including "not found").
    pub fn is_cached(&self, key: &K) -> bool {
        self.state.lock().cache.contains(key)
    }
}

#[async_trait]
impl<K, F> DispatchTarget for Loader<K, F>
where
    K: Send + Sync + Hash + Eq + Clone + 'static,
    F: BatchFn<K>,
{
    fn loader_id(&self) -> LoaderId {
        self.id
    }

    async fn dispatch(&self) {
        let keys = {
            let mut guard = self.state.lock();
            let state = &mut *guard;
            let keys = std::mem::take(&mut state.pending);
            state.in_flight.extend(keys.iter().cloned());
            keys
        };
        if keys.is_empty() {
            return;
        }

        debug!(loader = self.name, keys = keys.len(), "Dispatching batch");

        match self.batch_fn.load(&keys).await {
            Ok(mut values) => {
                // Move outcomes into the cache and detach waiters under one
                // lock, then resolve the waiters outside of it.
                let mut resolved = Vec::with_capacity(keys.len());
                {
                    let mut guard = self.state.lock();
                    let state = &mut *guard;
                    for key in keys {
                        let outcome = values.remove(&key);
                        state.in_flight.remove(&key);
                        let waiters = state.waiters.remove(&key).unwrap_or_default();
                        state.cache.insert(key, outcome.clone());
                        resolved.push((outcome, waiters));
                    }
                }

                for (outcome, waiters) in resolved {
                    for tx in waiters {
                        let _ = tx.send(Ok(outcome.clone()));
                    }
                }
            }
            Err(err) => {
                debug!(loader = self.name, error = ?err, "Batch fetch failed");

                // Nothing is cached: the failure poisons only the keys
                // pending at this dispatch, and a later load of any of them
                // will fetch again.
                let failed: Vec<Waiter<F::Value, F::Error>> = {
                    let mut guard = self.state.lock();
                    let state = &mut *guard;
                    let mut failed = Vec::new();
                    for key in &keys {
                        state.in_flight.remove(key);
                        if let Some(waiters) = state.waiters.remove(key) {
                            failed.extend(waiters);
                        }
                    }
                    failed
                };

                for tx in failed {
                    let _ = tx.send(Err(LoadError::Fetch(err.clone())));
                }
            }
        }
    }

    fn discard_pending(&self) {
        let dropped: Vec<Waiter<F::Value, F::Error>> = {
            let mut guard = self.state.lock();
            let state = &mut *guard;
            let keys = std::mem::take(&mut state.pending);
            keys.iter()
                .filter_map(|key| state.waiters.remove(key))
                .flatten()
                .collect()
        };

        for tx in dropped {
            let _ = tx.send(Err(LoadError::Cancelled));
        }
    }
}
