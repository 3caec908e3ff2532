//! One-to-many "by foreign key" loader for relation fan-out
//!
//! This is the mechanism behind `Author.Books`, `Book.Reviews`, and
//! `User.Borrowings`: one fetch returns every child for every parent
//! requested in the burst, and the loader partitions the flat result set
//! back onto the parents locally. A parent with no children gets an empty
//! list, never a missing entry.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;

use async_trait::async_trait;

use crate::batch::BatchFn;
use crate::error::LoadError;
use crate::loader::Loader;
use crate::scheduler::BatchScheduler;

/// How a child row names its parent.
///
/// Implemented by child entities so batch-loaded rows can be grouped by
/// their foreign-key value.
pub trait GroupKey<K> {
    /// The parent key this child belongs to.
    fn group_key(&self) -> K;
}

/// Batch fetch for a one-to-many relation: given a set of parent keys,
/// return all matching children in one round trip, e.g.
/// `SELECT ... WHERE author_id IN (...)`. Grouping is the loader's job.
#[async_trait]
pub trait RelationFetch<K>: Send + Sync + 'static
where
    K: Send + Sync + Hash + Eq + Clone + 'static,
{
    type Child: GroupKey<K> + Send + Sync + Clone + 'static;
    type Error: Send + Sync + Clone + Debug + 'static;

    async fn fetch_children(&self, keys: &[K]) -> Result<Vec<Self::Child>, Self::Error>;
}

/// Adapter that turns a flat child fetch into per-parent groups.
struct GroupedBatchFn<F>(F);

#[async_trait]
impl<K, F> BatchFn<K> for GroupedBatchFn<F>
where
    K: Send + Sync + Hash + Eq + Clone + 'static,
    F: RelationFetch<K>,
{
    type Value = Vec<F::Child>;
    type Error = F::Error;

    async fn load(&self, keys: &[K]) -> Result<HashMap<K, Vec<F::Child>>, F::Error> {
        let children = self.0.fetch_children(keys).await?;

        // Every requested key gets a bucket up front, so a childless parent
        // resolves to an empty list and that outcome is cached like any
        // other. Children pointing at a parent nobody asked for are
        // dropped.
        let mut groups: HashMap<K, Vec<F::Child>> =
            keys.iter().map(|key| (key.clone(), Vec::new())).collect();
        for child in children {
            if let Some(bucket) = groups.get_mut(&child.group_key()) {
                bucket.push(child);
            }
        }
        Ok(groups)
    }
}

/// Batching loader for one-to-many relations.
pub struct RelationLoader<K, F>
where
    K: Send + Sync + Hash + Eq + Clone + 'static,
    F: RelationFetch<K>,
{
    inner: Arc<Loader<K, GroupedBatchFn<F>>>,
}

impl<K, F> RelationLoader<K, F>
where
    K: Send + Sync + Hash + Eq + Clone + 'static,
    F: RelationFetch<K>,
{
    /// `relation` names the loader in trace output, e.g.
    /// `"books_by_author"`.
    pub fn new(relation: &'static str, fetch: F, scheduler: &Arc<BatchScheduler>) -> Self {
        Self { inner: Loader::new(relation, GroupedBatchFn(fetch), scheduler) }
    }

    /// Load every child of `parent`, batched with the rest of the burst.
    /// Zero matches is `Ok(vec![])`.
    pub async fn load_related(&self, parent: K) -> Result<Vec<F::Child>, LoadError<F::Error>> {
        Ok(self.inner.load(parent).await?.unwrap_or_default())
    }

    /// Load the children of several parents; one `Vec` per parent,
    /// positionally aligned with the input keys.
    pub async fn load_related_many<I>(
        &self,
        parents: I,
    ) -> Result<Vec<Vec<F::Child>>, LoadError<F::Error>>
    where
        I: IntoIterator<Item = K>,
    {
        let groups = self.inner.load_many(parents).await?;
        Ok(groups.into_iter().map(Option::unwrap_or_default).collect())
    }
}

impl<K, F> Clone for RelationLoader<K, F>
where
    K: Send + Sync + Hash + Eq + Clone + 'static,
    F: RelationFetch<K>,
{
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}
