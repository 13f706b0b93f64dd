use thiserror::Error;

/// Convenience result alias for fallible kernel operations.
pub type StructSimResult<T> = Result<T, StructSimError>;

/// Errors surfaced by the structural-similarity kernel.
#[derive(Debug, Error)]
pub enum StructSimError {
    /// A regular mode was asked for a window other than 11, or a block
    /// mode for a window other than 8/16.
    #[error("unsupported window size {0} for this mode")]
    UnsupportedWindow(usize),
}
