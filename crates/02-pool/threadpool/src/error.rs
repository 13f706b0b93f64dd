use thiserror::Error;

/// Convenience result alias for fallible pool operations.
pub type PoolResult<T> = Result<T, PoolError>;

/// Errors surfaced by the worker pool and its per-client interfaces.
#[derive(Debug, Error)]
pub enum PoolError {
    /// A client operation referenced an id that was never registered, or
    /// was already unregistered.
    #[error("client {0:?} is not registered with this pool")]
    UnknownClient(crate::ClientId),

    /// A task was submitted after the pool began shutting down.
    #[error("cannot submit tasks: pool is shutting down")]
    ShuttingDown,
}
