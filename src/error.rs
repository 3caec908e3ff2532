//! Error types surfaced to load callers

use thiserror::Error;

/// Why a pending load did not resolve to a value.
///
/// `E` is the fetch function's own error type. A fetch failure is not
/// sticky: the loader that produced it keeps working, and a later load of a
/// new key will attempt a fresh fetch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError<E> {
    /// The batch fetch failed wholesale. Every caller waiting on that
    /// dispatch receives a clone of the same underlying error.
    #[error("batch fetch failed: {0:?}")]
    Fetch(E),

    /// The operation was cancelled before this key's batch was dispatched.
    /// No fetch was issued for it.
    #[error("load cancelled before dispatch")]
    Cancelled,
}

impl<E> LoadError<E> {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, LoadError::Cancelled)
    }
}
