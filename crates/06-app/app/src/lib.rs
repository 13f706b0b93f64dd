//! The driver: wires `SequenceIO`, `ColorConverter`, the metric kernels and
//! `Reporter` together into one frame-by-frame run.

mod driver;
mod error;

pub use driver::{required_margin, Driver};
pub use error::{AppError, AppResult};
