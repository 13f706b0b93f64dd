use thiserror::Error;

/// Convenience result alias for the driver.
pub type AppResult<T> = Result<T, AppError>;

/// Top-level error sum type, composing every collaborator's error enum the
/// way `transport-fabric::FabricError` composes `transport::TransportError`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] qmiv_config::ConfigError),

    #[error(transparent)]
    Io(#[from] seqio::IoError),

    #[error(transparent)]
    Color(#[from] colorspace::ColorError),

    #[error(transparent)]
    Metrics(#[from] ivmetrics::MetricsError),

    #[error(transparent)]
    Report(#[from] report::ReportError),

    #[error(transparent)]
    Picture(#[from] picture::PictureError),

    #[error(transparent)]
    Pool(#[from] threadpool::PoolError),

    /// A pel fell outside `[0, 2^bitDepth)` and `InvalidPelActn` was `ABORT`.
    #[error("frame {frame}: pel out of range in '{which}': {source}")]
    RangeError {
        frame: usize,
        which: &'static str,
        #[source]
        source: picture::PictureError,
    },

    /// A derived name didn't match expectation and `NameMismatchActn` was `ABORT`.
    #[error("name mismatch: {0}")]
    NameMismatch(String),
}
