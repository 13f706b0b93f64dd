//! Per-window structural similarity kernel.
//!
//! [`calc_wnd`] is the primitive every SSIM/MS-SSIM/IV-SSIM computation is
//! built from: given two same-sized windows it returns one double. The
//! five [`StructSimMode`] variants differ only in how the window's first
//! and second moments are weighted; [`num_blocks`] gives the closed-form
//! window count a caller needs to size its row-dispatch and output grid
//! before ever touching a pixel.

mod blocks;
mod error;
mod gaussian;
mod kernel;
mod simd;

pub use blocks::{num_blocks, num_blocks_loop_counted};
pub use error::{StructSimError, StructSimResult};
pub use kernel::{calc_wnd, StructSimMode};
