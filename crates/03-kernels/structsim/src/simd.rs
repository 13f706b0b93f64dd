use std::sync::OnceLock;

use crate::kernel::{finish_ssim, Moments};

/// Signature every `BlockAveraged` kernel variant implements; all variants
/// must return bit-identical doubles for identical inputs.
pub(crate) type BlockAveragedFn =
    fn(&[u16], usize, &[u16], usize, usize, u32, bool) -> f64;

fn scalar(
    test: &[u16],
    test_stride: usize,
    refr: &[u16],
    ref_stride: usize,
    window: usize,
    max_pel: u32,
    calc_luminance: bool,
) -> f64 {
    let n = (window * window) as f64;
    let (mut sum_t, mut sum_r, mut sum_tt, mut sum_rr, mut sum_tr) = (0i64, 0i64, 0i64, 0i64, 0i64);
    for y in 0..window {
        let t_row = &test[y * test_stride..y * test_stride + window];
        let r_row = &refr[y * ref_stride..y * ref_stride + window];
        for (t, r) in t_row.iter().zip(r_row.iter()) {
            let (t, r) = (*t as i64, *r as i64);
            sum_t += t;
            sum_r += r;
            sum_tt += t * t;
            sum_rr += r * r;
            sum_tr += t * r;
        }
    }
    finish_from_sums(sum_t, sum_r, sum_tt, sum_rr, sum_tr, n, max_pel, calc_luminance)
}

fn finish_from_sums(
    sum_t: i64,
    sum_r: i64,
    sum_tt: i64,
    sum_rr: i64,
    sum_tr: i64,
    n: f64,
    max_pel: u32,
    calc_luminance: bool,
) -> f64 {
    let mean_t = sum_t as f64 / n;
    let mean_r = sum_r as f64 / n;
    let moments = Moments {
        mean_t,
        mean_r,
        var_t: sum_tt as f64 / n - mean_t * mean_t,
        var_r: sum_rr as f64 / n - mean_r * mean_r,
        covar: sum_tr as f64 / n - mean_t * mean_r,
    };
    finish_ssim(moments, max_pel, calc_luminance)
}

#[cfg(target_arch = "x86_64")]
mod x86 {
    use std::arch::x86_64::*;

    /// Zero-extends 8 lanes of `u16` into `i32`, sums exact integer
    /// products; reduces an 8-wide chunk at a time and a scalar tail, so
    /// it accumulates the exact same terms as the portable path just in a
    /// different grouping order (integer addition, so no rounding drift).
    unsafe fn reduce_row(t: &[u16], r: &[u16]) -> (i64, i64, i64, i64, i64) {
        let len = t.len();
        let (mut sum_t, mut sum_r, mut sum_tt, mut sum_rr, mut sum_tr) = (0i64, 0i64, 0i64, 0i64, 0i64);
        let zero = _mm_setzero_si128();
        let mut x = 0;
        while x + 8 <= len {
            let tv = _mm_loadu_si128(t.as_ptr().add(x) as *const __m128i);
            let rv = _mm_loadu_si128(r.as_ptr().add(x) as *const __m128i);
            let mut lanes_t = [0i32; 8];
            let mut lanes_r = [0i32; 8];
            _mm_storeu_si128(lanes_t.as_mut_ptr() as *mut __m128i, _mm_unpacklo_epi16(tv, zero));
            _mm_storeu_si128(
                lanes_t[4..].as_mut_ptr() as *mut __m128i,
                _mm_unpackhi_epi16(tv, zero),
            );
            _mm_storeu_si128(lanes_r.as_mut_ptr() as *mut __m128i, _mm_unpacklo_epi16(rv, zero));
            _mm_storeu_si128(
                lanes_r[4..].as_mut_ptr() as *mut __m128i,
                _mm_unpackhi_epi16(rv, zero),
            );
            for i in 0..8 {
                let tt = lanes_t[i] as i64;
                let rr = lanes_r[i] as i64;
                sum_t += tt;
                sum_r += rr;
                sum_tt += tt * tt;
                sum_rr += rr * rr;
                sum_tr += tt * rr;
            }
            x += 8;
        }
        for i in x..len {
            let tt = t[i] as i64;
            let rr = r[i] as i64;
            sum_t += tt;
            sum_r += rr;
            sum_tt += tt * tt;
            sum_rr += rr * rr;
            sum_tr += tt * rr;
        }
        (sum_t, sum_r, sum_tt, sum_rr, sum_tr)
    }

    pub(super) fn sse2(
        test: &[u16],
        test_stride: usize,
        refr: &[u16],
        ref_stride: usize,
        window: usize,
        max_pel: u32,
        calc_luminance: bool,
    ) -> f64 {
        let (mut sum_t, mut sum_r, mut sum_tt, mut sum_rr, mut sum_tr) = (0i64, 0i64, 0i64, 0i64, 0i64);
        for y in 0..window {
            let t_row = &test[y * test_stride..y * test_stride + window];
            let r_row = &refr[y * ref_stride..y * ref_stride + window];
            // SAFETY: caller selected this variant only after
            // `is_x86_feature_detected!("sse2")` returned true.
            let (st, sr, stt, srr, str_) = unsafe { reduce_row(t_row, r_row) };
            sum_t += st;
            sum_r += sr;
            sum_tt += stt;
            sum_rr += srr;
            sum_tr += str_;
        }
        let n = (window * window) as f64;
        super::finish_from_sums(sum_t, sum_r, sum_tt, sum_rr, sum_tr, n, max_pel, calc_luminance)
    }
}

static KERNEL: OnceLock<BlockAveragedFn> = OnceLock::new();

/// Returns the `BlockAveraged` kernel variant chosen once at startup for
/// this process's hardware.
pub(crate) fn block_averaged_kernel() -> BlockAveragedFn {
    *KERNEL.get_or_init(|| {
        #[cfg(target_arch = "x86_64")]
        {
            if is_x86_feature_detected!("sse2") {
                return x86::sse2;
            }
        }
        scalar
    })
}
