use thiserror::Error;

/// Convenience result alias for fallible metric computations.
pub type MetricsResult<T> = Result<T, MetricsError>;

/// Errors surfaced by the metric drivers in this crate.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// The two input pictures, or a picture and its configured scan
    /// parameters, don't agree on geometry.
    #[error("incompatible layout: {0}")]
    IncompatibleLayout(&'static str),

    #[error(transparent)]
    Picture(#[from] picture::PictureError),

    #[error(transparent)]
    StructSim(#[from] structsim::StructSimError),

    #[error(transparent)]
    Pool(#[from] threadpool::PoolError),
}
