use std::sync::Arc;

use parking_lot::Mutex;
use picture::{PicI, PicP};
use threadpool::{ThPI, ThreadPool};

use crate::error::{MetricsError, MetricsResult};
use crate::glob_clr_diff::GlobClrDiff;

/// Enumerates search offsets in row-major `(dy, dx)` order with the
/// central offset listed first, so a caller seeding its running best with
/// the first entry gives `(0, 0)` priority on exact ties.
fn offsets_center_first(r: isize) -> Vec<(isize, isize)> {
    let mut offsets = Vec::with_capacity((((2 * r + 1) * (2 * r + 1)) + 1) as usize);
    offsets.push((0, 0));
    for dy in -r..=r {
        for dx in -r..=r {
            offsets.push((dy, dx));
        }
    }
    offsets
}

/// Scores every candidate offset by comparing whole pixels (all components
/// fetched in one [`PicI::get_pixel`] access) rather than plane-by-plane.
fn best_shift(
    refr: &PicI,
    test: &PicI,
    x: usize,
    y: usize,
    offsets: &[(isize, isize)],
    num_components: usize,
    weights: &[i32],
    delta: &[i32; 4],
) -> ([u16; 4], [u16; 4]) {
    let tst_target: [i32; 4] = std::array::from_fn(|c| {
        if c < num_components {
            test.get_padded(c, x as isize, y as isize) as i32 + delta[c]
        } else {
            0
        }
    });
    let ref_target: [i32; 4] = std::array::from_fn(|c| {
        if c < num_components {
            refr.get_padded(c, x as isize, y as isize) as i32 - delta[c]
        } else {
            0
        }
    });

    let mut best_ref = [0u16; 4];
    let mut best_ref_dist = i64::MAX;
    let mut best_test = [0u16; 4];
    let mut best_test_dist = i64::MAX;

    for &(dy, dx) in offsets {
        let px = x as isize + dx;
        let py = y as isize + dy;

        let ref_pixel = refr.get_pixel(px, py);
        let test_pixel = test.get_pixel(px, py);

        let mut ref_dist = 0i64;
        let mut test_dist = 0i64;
        for c in 0..num_components {
            let w = weights.get(c).copied().unwrap_or(1) as i64;
            ref_dist += w * (ref_pixel[c] as i32 - tst_target[c]).unsigned_abs() as i64;
            test_dist += w * (test_pixel[c] as i32 - ref_target[c]).unsigned_abs() as i64;
        }

        if ref_dist < best_ref_dist {
            best_ref_dist = ref_dist;
            best_ref[..num_components].copy_from_slice(&ref_pixel[..num_components]);
        }
        if test_dist < best_test_dist {
            best_test_dist = test_dist;
            best_test[..num_components].copy_from_slice(&test_pixel[..num_components]);
        }
    }

    (best_ref, best_test)
}

/// Generates the shift-compensated pair `(RefSCP, TstSCP)`.
///
/// Both `refr` and `test` must have margin >= `search_range` and be
/// margin-extended; the search minimizes a weighted-L1 color distance
/// inside the `(2R+1)x(2R+1)` window around each pixel, with offset
/// `(0, 0)` winning exact ties.
pub fn compute(
    pool: &Arc<ThreadPool>,
    refr: &PicP,
    test: &PicP,
    search_range: usize,
    weights: &[i32],
    color_diff: &GlobClrDiff,
) -> MetricsResult<(PicP, PicP)> {
    if refr.margin() < search_range || test.margin() < search_range {
        return Err(MetricsError::IncompatibleLayout(
            "shift compensation search range exceeds picture margin",
        ));
    }
    if !refr.is_margin_extended() || !test.is_margin_extended() {
        return Err(MetricsError::IncompatibleLayout(
            "shift compensation requires extended margins on both inputs",
        ));
    }

    let num_components = refr.num_components();
    let width = refr.width();
    let height = refr.height();
    let offsets = offsets_center_first(search_range as isize);
    let weights = weights.to_vec();
    let delta = color_diff.delta;

    let refr_arc = Arc::new(PicI::from_planar(refr));
    let test_arc = Arc::new(PicI::from_planar(test));

    let ref_rows: Arc<Mutex<Vec<Option<Vec<Vec<u16>>>>>> = Arc::new(Mutex::new(vec![None; height]));
    let test_rows: Arc<Mutex<Vec<Option<Vec<Vec<u16>>>>>> = Arc::new(Mutex::new(vec![None; height]));

    let mut ti = ThPI::new(Arc::clone(pool), height.max(1));
    for y in 0..height {
        let refr_arc = Arc::clone(&refr_arc);
        let test_arc = Arc::clone(&test_arc);
        let offsets = offsets.clone();
        let weights = weights.clone();
        let ref_rows = Arc::clone(&ref_rows);
        let test_rows = Arc::clone(&test_rows);
        ti.add_waiting_task(0, move |_thread_idx| {
            let mut ref_scp_row = vec![vec![0u16; width]; num_components];
            let mut test_scp_row = vec![vec![0u16; width]; num_components];
            for x in 0..width {
                let (best_ref, best_test) =
                    best_shift(&refr_arc, &test_arc, x, y, &offsets, num_components, &weights, &delta);
                for c in 0..num_components {
                    ref_scp_row[c][x] = best_ref[c];
                    test_scp_row[c][x] = best_test[c];
                }
            }
            ref_rows.lock()[y] = Some(ref_scp_row);
            test_rows.lock()[y] = Some(test_scp_row);
        })?;
    }
    ti.wait_until_finished_all();

    let mut ref_scp = PicP::new(
        width,
        height,
        refr.bit_depth(),
        refr.margin(),
        num_components,
        refr.chroma_format(),
    );
    let mut test_scp = PicP::new(
        width,
        height,
        test.bit_depth(),
        test.margin(),
        num_components,
        test.chroma_format(),
    );

    let ref_rows = Arc::try_unwrap(ref_rows)
        .unwrap_or_else(|_| unreachable!("all row tasks have completed and dropped their clones"))
        .into_inner();
    let test_rows = Arc::try_unwrap(test_rows)
        .unwrap_or_else(|_| unreachable!("all row tasks have completed and dropped their clones"))
        .into_inner();

    for y in 0..height {
        let ref_row = ref_rows[y].as_ref().expect("every row was dispatched");
        let test_row = test_rows[y].as_ref().expect("every row was dispatched");
        for c in 0..num_components {
            for x in 0..width {
                ref_scp.set(c, x, y, ref_row[c][x]);
                test_scp.set(c, x, y, test_row[c][x]);
            }
        }
    }
    ref_scp.extend();
    test_scp.extend();

    Ok((ref_scp, test_scp))
}

#[cfg(test)]
mod tests {
    use super::*;
    use picture::ChromaFormat;

    #[test]
    fn identical_pictures_scp_to_themselves() {
        let pool = ThreadPool::new(2, 8);
        let mut refr = PicP::new(6, 6, 8, 2, 1, ChromaFormat::Mono400);
        let mut test = PicP::new(6, 6, 8, 2, 1, ChromaFormat::Mono400);
        for y in 0..6 {
            for x in 0..6 {
                let v = ((x + y) * 10) as u16;
                refr.set(0, x, y, v);
                test.set(0, x, y, v);
            }
        }
        refr.extend();
        test.extend();
        let color_diff = GlobClrDiff::default();
        let (ref_scp, test_scp) = compute(&pool, &refr, &test, 2, &[1], &color_diff).unwrap();
        assert!(ref_scp.equal(&refr, false));
        assert!(test_scp.equal(&test, false));
        pool.destroy();
    }

    #[test]
    fn rejects_insufficient_margin() {
        let pool = ThreadPool::new(1, 8);
        let refr = PicP::new(6, 6, 8, 1, 1, ChromaFormat::Mono400);
        let test = PicP::new(6, 6, 8, 1, 1, ChromaFormat::Mono400);
        let color_diff = GlobClrDiff::default();
        assert!(compute(&pool, &refr, &test, 2, &[1], &color_diff).is_err());
        pool.destroy();
    }
}
