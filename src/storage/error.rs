//! Store error type.

use crate::codec::BoxError;
use crate::context::Done;
use thiserror::Error;

/// Errors returned by [`Store`](crate::Store) operations.
///
/// A miss is not an error: lookups report it as `Ok(false)` or `Ok(None)`.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The caller's context was cancelled or ran out of time.
    #[error("operation aborted: {0}")]
    Cancelled(#[from] Done),

    /// The value could not be serialized. The map was not touched.
    #[error("failed to encode value: {0}")]
    Encode(#[source] BoxError),

    /// A stored payload could not be decoded. Implies the key was found.
    #[error("failed to decode value: {0}")]
    Decode(#[source] BoxError),

    /// `add` or `insert` targeted a key that already holds a live entry.
    #[error("the key already exists")]
    KeyExists,

    /// The key is absent or expired.
    #[error("no such key")]
    NoSuchKey,

    /// A store was constructed outside of a Tokio runtime, so its sweeper
    /// could not be started.
    #[error("no Tokio runtime available to run the expiry sweeper")]
    NoRuntime,
}

impl StoreError {
    /// Returns `true` for cancellation and deadline errors.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, StoreError::Cancelled(_))
    }
}

/// Result alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
