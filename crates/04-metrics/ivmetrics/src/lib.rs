//! Objective picture-quality metrics: PSNR/WS-PSNR/IV-PSNR and
//! SSIM/MS-SSIM/IV-SSIM/IV-MS-SSIM, plus the shift-compensation and
//! global-color-difference preprocessing IV-PSNR/IV-SSIM need.
//!
//! Every per-pixel pass in this crate dispatches row-strip work across a
//! shared [`threadpool::ThreadPool`] via [`threadpool::ThPI`], and reduces
//! partial sums with [`kbns::Kbns`] so the result doesn't depend on the
//! order worker threads finish in.

mod error;
mod glob_clr_diff;
mod psnr;
mod scp;
mod ssim;
mod stat;

pub use error::{MetricsError, MetricsResult};
pub use glob_clr_diff::{compute as glob_clr_diff, GlobClrDiff};
pub use psnr::{iv_psnr, plain_psnr, psnr, PsnrComponents, PsnrResult, FAKE_INFINITY};
pub use scp::compute as shift_compensate;
pub use ssim::{iv_ssim, ms_ssim, ssim_picture, SsimResult};
pub use stat::{MetricKind, MetricStat};
