//! Batched relational data loading for GraphQL resolvers
//!
//! Loaders solve the N+1 problem by collecting every entity request made
//! during one resolution burst and executing them as a single batch fetch.
//!
//! # Architecture
//!
//! The pattern works as follows:
//! 1. When the executor resolves `Authors { Books { ... } }`, each Author's
//!    Books resolver calls `loader.load_related(author_id)`
//! 2. The key is queued and a pending future is returned; the executor
//!    carries on with sibling fields, queueing more keys
//! 3. At the boundary of the burst the executor calls
//!    [`BatchScheduler::dispatch`], which fires each dirty loader's batch
//!    fetch exactly once with every distinct queued key
//! 4. Each result is fanned back out to all waiting callers and cached for
//!    the rest of the request, so repeat loads resolve without a new fetch
//!
//! A loader/scheduler pair is scoped to one request. Build them together at
//! the start of the operation and let them drop at the end; sharing a loader
//! across requests would leak one request's cache into the next.
//!
//! # Adding a New Relation
//!
//! 1. Implement [`RelationFetch`] for the relational-query layer (one
//!    `WHERE fk IN (...)` round trip returning all matching children)
//! 2. Implement [`GroupKey`] for the child type so results can be
//!    partitioned back onto their parents
//! 3. Register a [`RelationLoader`] in the request context and call
//!    `load_related(parent_id)` from the field resolver

mod batch;
mod cache;
mod error;
mod grouped;
mod keyed;
mod loader;
mod scheduler;

pub use batch::BatchFn;
pub use error::LoadError;
pub use grouped::{GroupKey, RelationFetch, RelationLoader};
pub use keyed::EntityLoader;
pub use loader::Loader;
pub use scheduler::BatchScheduler;
