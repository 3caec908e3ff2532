//! Batch-fetch contract supplied by the relational-query layer

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

use async_trait::async_trait;

/// A batch fetch that resolves many keys in one round trip.
///
/// The loader guarantees `keys` contains each distinct key at most once,
/// no matter how many resolvers requested it. Keys absent from the returned
/// map are treated as "no matching record", not as errors; callers see them
/// as `None`. A wholesale `Err` fails every load waiting on this dispatch
/// with a clone of the same error, which is why `Error` must be `Clone`
/// (wrap non-cloneable database errors in an `Arc`).
#[async_trait]
pub trait BatchFn<K>: Send + Sync + 'static
where
    K: Send + Sync + Hash + Eq + Clone + 'static,
{
    type Value: Send + Sync + Clone + 'static;
    type Error: Send + Sync + Clone + Debug + 'static;

    /// Load the records for `keys`, e.g. `SELECT ... WHERE id IN (...)`.
    async fn load(&self, keys: &[K]) -> Result<HashMap<K, Self::Value>, Self::Error>;
}
