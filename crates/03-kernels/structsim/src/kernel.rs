use crate::error::{StructSimError, StructSimResult};
use crate::gaussian::table_for_window;

const K1: f64 = 0.01;
const K2: f64 = 0.03;

/// The five structural-similarity windowing modes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StructSimMode {
    RegularGaussianFlt,
    RegularGaussianInt,
    RegularAveraged,
    BlockGaussianInt,
    BlockAveraged,
}

impl StructSimMode {
    /// Case-insensitive lookup by configuration name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "regulargaussianflt" => Some(Self::RegularGaussianFlt),
            "regulargaussianint" => Some(Self::RegularGaussianInt),
            "regularaveraged" => Some(Self::RegularAveraged),
            "blockgaussianint" => Some(Self::BlockGaussianInt),
            "blockaveraged" => Some(Self::BlockAveraged),
            _ => None,
        }
    }

    /// Regular modes are fixed at an 11x11 window; block modes accept 8 or
    /// 16, chosen by the caller.
    pub fn validate_window(self, window: usize) -> StructSimResult<()> {
        let ok = match self {
            Self::RegularGaussianFlt | Self::RegularGaussianInt | Self::RegularAveraged => {
                window == 11
            }
            Self::BlockGaussianInt | Self::BlockAveraged => window == 8 || window == 16,
        };
        if ok {
            Ok(())
        } else {
            Err(StructSimError::UnsupportedWindow(window))
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct Moments {
    pub(crate) mean_t: f64,
    pub(crate) mean_r: f64,
    pub(crate) var_t: f64,
    pub(crate) var_r: f64,
    pub(crate) covar: f64,
}

pub(crate) fn finish_ssim(m: Moments, max_pel: u32, calc_luminance: bool) -> f64 {
    let max_pel_f = max_pel as f64;
    let c1 = (K1 * max_pel_f).powi(2);
    let c2 = (K2 * max_pel_f).powi(2);
    let l = (2.0 * m.mean_r * m.mean_t + c1) / (m.mean_r * m.mean_r + m.mean_t * m.mean_t + c1);
    let cs = (2.0 * m.covar + c2) / (m.var_r + m.var_t + c2);
    if calc_luminance {
        l * cs
    } else {
        cs
    }
}

fn moments_averaged(window: usize, test: &[u16], test_stride: usize, refr: &[u16], ref_stride: usize) -> Moments {
    let n = (window * window) as f64;
    let (mut sum_t, mut sum_r, mut sum_tt, mut sum_rr, mut sum_tr) = (0f64, 0f64, 0f64, 0f64, 0f64);
    for y in 0..window {
        let t_row = &test[y * test_stride..y * test_stride + window];
        let r_row = &refr[y * ref_stride..y * ref_stride + window];
        for (t, r) in t_row.iter().zip(r_row.iter()) {
            let (t, r) = (*t as f64, *r as f64);
            sum_t += t;
            sum_r += r;
            sum_tt += t * t;
            sum_rr += r * r;
            sum_tr += t * r;
        }
    }
    let mean_t = sum_t / n;
    let mean_r = sum_r / n;
    Moments {
        mean_t,
        mean_r,
        var_t: sum_tt / n - mean_t * mean_t,
        var_r: sum_rr / n - mean_r * mean_r,
        covar: sum_tr / n - mean_t * mean_r,
    }
}

fn moments_gaussian_float(
    window: usize,
    test: &[u16],
    test_stride: usize,
    refr: &[u16],
    ref_stride: usize,
) -> StructSimResult<Moments> {
    let table = table_for_window(window)?;
    let (mut sum_t, mut sum_r, mut sum_tt, mut sum_rr, mut sum_tr) = (0f64, 0f64, 0f64, 0f64, 0f64);
    for y in 0..window {
        let t_row = &test[y * test_stride..y * test_stride + window];
        let r_row = &refr[y * ref_stride..y * ref_stride + window];
        for x in 0..window {
            let w = table.float_weights[y * window + x];
            let t = t_row[x] as f64;
            let r = r_row[x] as f64;
            sum_t += w * t;
            sum_r += w * r;
            sum_tt += w * t * t;
            sum_rr += w * r * r;
            sum_tr += w * t * r;
        }
    }
    Ok(Moments {
        mean_t: sum_t,
        mean_r: sum_r,
        var_t: sum_tt - sum_t * sum_t,
        var_r: sum_rr - sum_r * sum_r,
        covar: sum_tr - sum_t * sum_r,
    })
}

fn moments_gaussian_int(
    window: usize,
    test: &[u16],
    test_stride: usize,
    refr: &[u16],
    ref_stride: usize,
) -> StructSimResult<Moments> {
    let table = table_for_window(window)?;
    let (mut sum_t, mut sum_r, mut sum_tt, mut sum_rr, mut sum_tr) = (0i64, 0i64, 0i64, 0i64, 0i64);
    for y in 0..window {
        let t_row = &test[y * test_stride..y * test_stride + window];
        let r_row = &refr[y * ref_stride..y * ref_stride + window];
        for x in 0..window {
            let w = table.int_weights[y * window + x];
            let t = t_row[x] as i64;
            let r = r_row[x] as i64;
            sum_t += w * t;
            sum_r += w * r;
            sum_tt += w * t * t;
            sum_rr += w * r * r;
            sum_tr += w * t * r;
        }
    }
    const SCALE: f64 = (1i64 << 18) as f64;
    let mean_t = sum_t as f64 / SCALE;
    let mean_r = sum_r as f64 / SCALE;
    Ok(Moments {
        mean_t,
        mean_r,
        var_t: sum_tt as f64 / SCALE - mean_t * mean_t,
        var_r: sum_rr as f64 / SCALE - mean_r * mean_r,
        covar: sum_tr as f64 / SCALE - mean_t * mean_r,
    })
}

/// Computes one window's SSIM value.
///
/// `test`/`refr` point at the top-left pel of the window, addressed by
/// their own stride; `window` must match the mode (11 for regular modes,
/// 8 or 16 for block modes).
pub fn calc_wnd(
    mode: StructSimMode,
    window: usize,
    test: &[u16],
    test_stride: usize,
    refr: &[u16],
    ref_stride: usize,
    max_pel: u32,
    calc_luminance: bool,
) -> StructSimResult<f64> {
    mode.validate_window(window)?;
    let moments = match mode {
        StructSimMode::RegularAveraged => moments_averaged(window, test, test_stride, refr, ref_stride),
        StructSimMode::RegularGaussianFlt => {
            moments_gaussian_float(window, test, test_stride, refr, ref_stride)?
        }
        StructSimMode::RegularGaussianInt | StructSimMode::BlockGaussianInt => {
            moments_gaussian_int(window, test, test_stride, refr, ref_stride)?
        }
        StructSimMode::BlockAveraged => {
            return Ok(crate::simd::block_averaged_kernel()(
                test,
                test_stride,
                refr,
                ref_stride,
                window,
                max_pel,
                calc_luminance,
            ));
        }
    };
    Ok(finish_ssim(moments, max_pel, calc_luminance))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniform_window(window: usize, value: u16) -> Vec<u16> {
        vec![value; window * window]
    }

    #[test]
    fn identical_uniform_windows_score_one() {
        for mode in [
            StructSimMode::RegularAveraged,
            StructSimMode::RegularGaussianFlt,
            StructSimMode::RegularGaussianInt,
        ] {
            let buf = uniform_window(11, 128);
            let ssim = calc_wnd(mode, 11, &buf, 11, &buf, 11, 255, true).unwrap();
            assert!((ssim - 1.0).abs() < 1e-9, "{mode:?} => {ssim}");
        }
    }

    #[test]
    fn block_modes_score_one_on_identical_windows() {
        for mode in [StructSimMode::BlockGaussianInt, StructSimMode::BlockAveraged] {
            for window in [8, 16] {
                let buf = uniform_window(window, 200);
                let ssim = calc_wnd(mode, window, &buf, window, &buf, window, 255, true).unwrap();
                assert!((ssim - 1.0).abs() < 1e-9, "{mode:?}/{window} => {ssim}");
            }
        }
    }

    #[test]
    fn rejects_mismatched_window_for_regular_mode() {
        let buf = uniform_window(8, 10);
        assert!(calc_wnd(StructSimMode::RegularAveraged, 8, &buf, 8, &buf, 8, 255, true).is_err());
    }

    #[test]
    fn rejects_unsupported_block_window() {
        let buf = uniform_window(32, 10);
        assert!(calc_wnd(StructSimMode::BlockAveraged, 32, &buf, 32, &buf, 32, 255, true).is_err());
    }

    #[test]
    fn from_name_is_case_insensitive() {
        assert_eq!(
            StructSimMode::from_name("blockAveraged"),
            Some(StructSimMode::BlockAveraged)
        );
        assert_eq!(StructSimMode::from_name("nope"), None);
    }
}
