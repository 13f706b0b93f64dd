use std::sync::Arc;

use kbns::Kbns;
use parking_lot::Mutex;
use picture::PicP;
use threadpool::{ThPI, ThreadPool};

use crate::error::MetricsResult;

/// Recorded in place of an undefined PSNR (zero MSE, or an empty mask) so
/// downstream averaging can treat it as an ordinary number.
pub const FAKE_INFINITY: f64 = 1e6;

/// Per-component result of one PSNR pass between two pictures.
#[derive(Clone, Copy, Debug, Default)]
pub struct PsnrComponents {
    pub per_component: [f64; 4],
    pub any_fake: bool,
}

/// Averages `values[..weights.len()]` by `weights`, falling back to an
/// unweighted mean when `CmpWeightsAverage` is unconfigured (every weight
/// zero, or absent).
pub(crate) fn cmp_weights_average(values: &[f64], weights: Option<&[i32]>) -> f64 {
    match weights {
        Some(weights) if weights.iter().any(|&w| w != 0) => {
            let denom: i64 = weights.iter().map(|&w| w as i64).sum();
            let numer: f64 = values
                .iter()
                .zip(weights.iter())
                .map(|(v, w)| v * (*w as f64))
                .sum();
            numer / denom as f64
        }
        _ => values.iter().sum::<f64>() / values.len() as f64,
    }
}

/// Computes per-component (optionally spherically weighted) PSNR between
/// `tst` and `refr`, gated by `mask` when present.
///
/// Row work is dispatched through `pool`'s `ThPI`; each row accumulates its
/// weighted squared error in KBNS, and row partials are KBNS-reduced again
/// on the calling thread.
pub fn psnr(
    pool: &Arc<ThreadPool>,
    tst: &PicP,
    refr: &PicP,
    mask: Option<&PicP>,
    spherical: bool,
    lat_range_rad: f64,
) -> MetricsResult<PsnrComponents> {
    let num_components = tst.num_components();
    let height = tst.height();
    let width = tst.width();
    let max_pel = tst.max_pel() as f64;

    let mut per_component = [0f64; 4];
    let mut any_fake = false;

    for c in 0..num_components {
        let sq_err_rows: Arc<Mutex<Vec<f64>>> = Arc::new(Mutex::new(vec![0.0; height]));
        let weight_rows: Arc<Mutex<Vec<f64>>> = Arc::new(Mutex::new(vec![0.0; height]));

        let mut ti = ThPI::new(Arc::clone(pool), height.max(1));
        for y in 0..height {
            let tst_row: Vec<u16> = (0..width).map(|x| tst.get(c, x, y)).collect();
            let ref_row: Vec<u16> = (0..width).map(|x| refr.get(c, x, y)).collect();
            let mask_row: Option<Vec<u16>> = mask.map(|m| (0..width).map(|x| m.get(0, x, y)).collect());
            let w = if spherical {
                (((y as f64 + 0.5) / height as f64 - 0.5) * lat_range_rad).cos()
            } else {
                1.0
            };
            let sq_err_rows = Arc::clone(&sq_err_rows);
            let weight_rows = Arc::clone(&weight_rows);
            ti.add_waiting_task(0, move |_thread_idx| {
                let mut acc = Kbns::new();
                let mut n = 0usize;
                for x in 0..width {
                    if let Some(mask_row) = &mask_row {
                        if mask_row[x] == 0 {
                            continue;
                        }
                    }
                    let diff = tst_row[x] as f64 - ref_row[x] as f64;
                    acc.add(diff * diff * w);
                    n += 1;
                }
                sq_err_rows.lock()[y] = acc.sum();
                weight_rows.lock()[y] = w * n as f64;
            })?;
        }
        ti.wait_until_finished_all();

        let mut sq_err_total = Kbns::new();
        sq_err_total.extend(sq_err_rows.lock().iter().copied());
        let mut weight_total = Kbns::new();
        weight_total.extend(weight_rows.lock().iter().copied());

        let weight_sum = weight_total.sum();
        if weight_sum == 0.0 {
            any_fake = true;
            per_component[c] = FAKE_INFINITY;
            continue;
        }

        let mse = sq_err_total.sum() / weight_sum;
        per_component[c] = if mse > 0.0 {
            10.0 * ((max_pel * max_pel) / mse).log10()
        } else {
            any_fake = true;
            FAKE_INFINITY
        };
    }

    Ok(PsnrComponents {
        per_component,
        any_fake,
    })
}

/// Picture-level result of a plain (non-IV) PSNR/WS-PSNR pass.
#[derive(Clone, Copy, Debug, Default)]
pub struct PsnrResult {
    pub per_component: [f64; 4],
    pub picture: f64,
    pub any_fake: bool,
}

/// PSNR or WS-PSNR (per `spherical`), aggregated to a picture-level value
/// via `CmpWeightsAverage` when configured.
pub fn plain_psnr(
    pool: &Arc<ThreadPool>,
    tst: &PicP,
    refr: &PicP,
    mask: Option<&PicP>,
    spherical: bool,
    lat_range_rad: f64,
    component_weights: Option<&[i32]>,
) -> MetricsResult<PsnrResult> {
    let components = psnr(pool, tst, refr, mask, spherical, lat_range_rad)?;
    let num_components = tst.num_components();
    let picture = cmp_weights_average(&components.per_component[..num_components], component_weights);
    Ok(PsnrResult {
        per_component: components.per_component,
        picture,
        any_fake: components.any_fake,
    })
}

/// IV-PSNR: PSNR against each shift-compensated picture, componentwise
/// minimum of the two directions, picture-level minimum of the two
/// direction averages.
#[allow(clippy::too_many_arguments)]
pub fn iv_psnr(
    pool: &Arc<ThreadPool>,
    tst: &PicP,
    refr: &PicP,
    ref_scp: &PicP,
    tst_scp: &PicP,
    mask: Option<&PicP>,
    spherical: bool,
    lat_range_rad: f64,
    component_weights: Option<&[i32]>,
) -> MetricsResult<PsnrResult> {
    let num_components = tst.num_components();
    let t2r = psnr(pool, tst, ref_scp, mask, spherical, lat_range_rad)?;
    let r2t = psnr(pool, refr, tst_scp, mask, spherical, lat_range_rad)?;

    let mut per_component = [0f64; 4];
    for c in 0..num_components {
        per_component[c] = t2r.per_component[c].min(r2t.per_component[c]);
    }

    let picture_t2r = cmp_weights_average(&t2r.per_component[..num_components], component_weights);
    let picture_r2t = cmp_weights_average(&r2t.per_component[..num_components], component_weights);

    Ok(PsnrResult {
        per_component,
        picture: picture_t2r.min(picture_r2t),
        any_fake: t2r.any_fake || r2t.any_fake,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use picture::ChromaFormat;

    #[test]
    fn identical_pictures_yield_fake_infinity() {
        let pool = ThreadPool::new(2, 8);
        let mut a = PicP::new(4, 4, 8, 0, 1, ChromaFormat::Mono400);
        let mut b = PicP::new(4, 4, 8, 0, 1, ChromaFormat::Mono400);
        a.fill(50);
        b.fill(50);
        let result = plain_psnr(&pool, &a, &b, None, false, std::f64::consts::PI, None).unwrap();
        assert_eq!(result.per_component[0], FAKE_INFINITY);
        assert!(result.any_fake);
        pool.destroy();
    }

    #[test]
    fn symmetric_in_its_arguments() {
        let pool = ThreadPool::new(2, 8);
        let mut a = PicP::new(4, 4, 8, 0, 1, ChromaFormat::Mono400);
        let mut b = PicP::new(4, 4, 8, 0, 1, ChromaFormat::Mono400);
        for y in 0..4 {
            for x in 0..4 {
                a.set(0, x, y, (x * 10 + y) as u16);
                b.set(0, x, y, (y * 10 + x) as u16);
            }
        }
        let ab = plain_psnr(&pool, &a, &b, None, false, std::f64::consts::PI, None).unwrap();
        let ba = plain_psnr(&pool, &b, &a, None, false, std::f64::consts::PI, None).unwrap();
        assert!((ab.picture - ba.picture).abs() < 1e-9);
        pool.destroy();
    }

    #[test]
    fn fully_masked_frame_is_fake() {
        let pool = ThreadPool::new(1, 8);
        let mut a = PicP::new(2, 2, 8, 0, 1, ChromaFormat::Mono400);
        let mut b = PicP::new(2, 2, 8, 0, 1, ChromaFormat::Mono400);
        let mask = PicP::new(2, 2, 8, 0, 1, ChromaFormat::Mono400);
        a.fill(10);
        b.fill(20);
        let result = plain_psnr(&pool, &a, &b, Some(&mask), false, std::f64::consts::PI, None).unwrap();
        assert!(result.any_fake);
        pool.destroy();
    }
}
