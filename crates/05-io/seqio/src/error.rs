use thiserror::Error;

/// Convenience result alias for fallible sequence I/O.
pub type IoResult<T> = Result<T, IoError>;

/// Errors surfaced while reading a raw picture sequence.
#[derive(Debug, Error)]
pub enum IoError {
    #[error("failed to open '{path}': {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("short read from '{path}': expected {expected} bytes, got {got}")]
    ShortRead { path: String, expected: usize, got: usize },

    #[error("frame size mismatch: layout expects {expected} bytes per frame, file '{path}' yields {actual}")]
    SizeMismatch { path: String, expected: usize, actual: usize },

    #[error("frame index {idx} is outside the configured range (start {start}, count {count})")]
    OutOfRange { idx: usize, start: usize, count: usize },

    #[error(transparent)]
    Picture(#[from] picture::PictureError),
}
