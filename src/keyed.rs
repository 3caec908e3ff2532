//! One-to-one "by ID" loader for primary-key lookups
//!
//! The thin facade resolvers use to fetch an entity by its identifier:
//! `Book.Author` calls `load_one(author_id)` and every such call across the
//! burst collapses into one `WHERE id IN (...)` fetch.

use std::hash::Hash;
use std::sync::Arc;

use crate::batch::BatchFn;
use crate::error::LoadError;
use crate::loader::Loader;
use crate::scheduler::BatchScheduler;

/// Batching loader for single-entity lookups.
///
/// A key with no matching record resolves to `Ok(None)`; whether a missing
/// entity is fatal is the resolver's call, not the loader's.
pub struct EntityLoader<K, F>
where
    K: Send + Sync + Hash + Eq + Clone + 'static,
    F: BatchFn<K>,
{
    inner: Arc<Loader<K, F>>,
}

impl<K, F> EntityLoader<K, F>
where
    K: Send + Sync + Hash + Eq + Clone + 'static,
    F: BatchFn<K>,
{
    /// `entity` names the loader in trace output, e.g. `"authors"`.
    pub fn new(entity: &'static str, fetch: F, scheduler: &Arc<BatchScheduler>) -> Self {
        Self { inner: Loader::new(entity, fetch, scheduler) }
    }

    /// Load a single entity by id, batched with every other `load_one`
    /// issued in the same resolution burst.
    pub async fn load_one(&self, id: K) -> Result<Option<F::Value>, LoadError<F::Error>> {
        self.inner.load(id).await
    }

    /// Load several entities by id; results are positionally aligned with
    /// the input ids.
    pub async fn load_many<I>(&self, ids: I) -> Result<Vec<Option<F::Value>>, LoadError<F::Error>>
    where
        I: IntoIterator<Item = K>,
    {
        self.inner.load_many(ids).await
    }
}

// Handed to each resolver that needs it; clones share one cache.
impl<K, F> Clone for EntityLoader<K, F>
where
    K: Send + Sync + Hash + Eq + Clone + 'static,
    F: BatchFn<K>,
{
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}
