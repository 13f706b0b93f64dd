use std::sync::Arc;

use kbns::Kbns;
use parking_lot::Mutex;
use picture::PicP;
use threadpool::{ThPI, ThreadPool};

use crate::error::MetricsResult;

/// Per-component Ref->Tst mean pixel difference, clamped to the
/// "unnoticeable" tolerance. Feeds shift compensation's target offset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GlobClrDiff {
    pub delta: [i32; 4],
}

/// Computes [`GlobClrDiff`] between `refr` and `test`, parallelized by row
/// and KBNS-accumulated across rows.
///
/// `unnoticeable_coef[c]` bounds `delta[c]` to `±round(unnoticeable_coef[c]
/// * maxPel)`.
pub fn compute(
    pool: &Arc<ThreadPool>,
    refr: &PicP,
    test: &PicP,
    unnoticeable_coef: &[f64],
) -> MetricsResult<GlobClrDiff> {
    let num_components = refr.num_components();
    let height = refr.height();
    let width = refr.width();
    let max_pel = refr.max_pel() as f64;

    let mut delta = [0i32; 4];
    for c in 0..num_components {
        let row_sums: Arc<Mutex<Vec<f64>>> = Arc::new(Mutex::new(vec![0.0; height]));
        let mut ti = ThPI::new(Arc::clone(pool), height.max(1));
        for y in 0..height {
            let ref_row: Vec<i32> = (0..width).map(|x| refr.get(c, x, y) as i32).collect();
            let test_row: Vec<i32> = (0..width).map(|x| test.get(c, x, y) as i32).collect();
            let row_sums = Arc::clone(&row_sums);
            ti.add_waiting_task(0, move |_thread_idx| {
                let mut acc = Kbns::new();
                for (r, t) in ref_row.iter().zip(test_row.iter()) {
                    acc.add((r - t) as f64);
                }
                row_sums.lock()[y] = acc.sum();
            })?;
        }
        ti.wait_until_finished_all();

        let mut total = Kbns::new();
        total.extend(row_sums.lock().iter().copied());
        let mean = total.sum() / (width * height) as f64;

        let coef = unnoticeable_coef.get(c).copied().unwrap_or(0.0);
        let tolerance = (coef * max_pel).round() as i32;
        delta[c] = (mean.round() as i32).clamp(-tolerance, tolerance);
    }

    Ok(GlobClrDiff { delta })
}

#[cfg(test)]
mod tests {
    use super::*;
    use picture::ChromaFormat;

    #[test]
    fn identical_pictures_produce_zero_offset() {
        let pool = ThreadPool::new(2, 8);
        let mut refr = PicP::new(4, 4, 8, 0, 1, ChromaFormat::Mono400);
        let mut test = PicP::new(4, 4, 8, 0, 1, ChromaFormat::Mono400);
        refr.fill(100);
        test.fill(100);
        let result = compute(&pool, &refr, &test, &[0.01]).unwrap();
        assert_eq!(result.delta[0], 0);
        pool.destroy();
    }

    #[test]
    fn offset_is_clamped_to_unnoticeable_tolerance() {
        let pool = ThreadPool::new(1, 8);
        let mut refr = PicP::new(4, 4, 8, 0, 1, ChromaFormat::Mono400);
        let mut test = PicP::new(4, 4, 8, 0, 1, ChromaFormat::Mono400);
        refr.fill(200);
        test.fill(100);
        // True mean diff is 100, but unnoticeable tolerance of 0.01*255 ~ 3.
        let result = compute(&pool, &refr, &test, &[0.01]).unwrap();
        assert_eq!(result.delta[0], 3);
        pool.destroy();
    }
}
