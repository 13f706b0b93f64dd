use thiserror::Error;

/// Convenience result alias for fallible picture operations.
pub type PictureResult<T> = Result<T, PictureError>;

/// Errors surfaced by picture plane and rental pool operations.
#[derive(Debug, Error)]
pub enum PictureError {
    /// Two pictures were used together (copy, equal, swap, bind) but their
    /// geometry (size, margin, bit depth, component count) does not match.
    #[error("incompatible picture layout: {0}")]
    IncompatibleLayout(&'static str),

    /// A pixel value fell outside `[0, 2^bitDepth)` during a `check()` call.
    #[error("pel out of range in plane '{name}' at ({x}, {y}): value {value} exceeds max {max}")]
    OutOfRange {
        /// Diagnostic name supplied by the caller.
        name: String,
        /// Column of the first offending pel.
        x: usize,
        /// Row of the first offending pel.
        y: usize,
        /// The offending value.
        value: u16,
        /// The maximum valid value for the plane's bit depth.
        max: u16,
    },

    /// The rental pool reached `size_limit` and cannot allocate a new buffer.
    #[error("picture rental pool exhausted: {in_use} buffers in use, limit is {limit}")]
    ResourceExhaustion {
        /// Number of buffers currently lent out (or otherwise accounted for).
        in_use: usize,
        /// The pool's configured size limit.
        limit: usize,
    },
}
