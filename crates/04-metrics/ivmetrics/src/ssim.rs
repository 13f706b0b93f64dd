use std::sync::Arc;

use kbns::Kbns;
use parking_lot::Mutex;
use picture::PicP;
use structsim::{calc_wnd, StructSimError, StructSimMode};
use threadpool::{ThPI, ThreadPool};

use crate::error::{MetricsError, MetricsResult};
use crate::psnr::cmp_weights_average;

/// Result of one SSIM/MS-SSIM/IV-SSIM/IV-MS-SSIM pass.
#[derive(Clone, Copy, Debug, Default)]
pub struct SsimResult {
    pub per_component: [f64; 4],
    pub picture: f64,
    pub any_fake: bool,
}

fn axis_positions(beg: usize, end: usize, stride: usize) -> Vec<usize> {
    let stride = stride.max(1);
    let mut v = Vec::new();
    let mut p = beg;
    while p < end {
        v.push(p);
        p += stride;
    }
    v
}

fn axis_positions_block(length: usize, window: usize, stride: usize) -> Vec<usize> {
    let stride = stride.max(1);
    let mut v = Vec::new();
    if length < window {
        return v;
    }
    let mut p = 0;
    while p + window <= length {
        v.push(p);
        p += stride;
    }
    v
}

fn window_offset(pic: &PicP, origin_x: isize, origin_y: isize) -> usize {
    let stride = pic.stride() as isize;
    (pic.origin_offset() as isize + origin_y * stride + origin_x) as usize
}

/// Computes one picture's SSIM (a single-scale pass; also the building
/// block [`ms_ssim`] calls once per pyramid level).
///
/// Regular modes (`window == 11`) sample window *centers* on a stride
/// grid; block modes sample window *top-left corners* at `stride`
/// increments up to the point the window still fits. `use_margin`
/// extends the regular scan to the full picture height/width, requiring
/// `margin >= window / 2` on both inputs.
#[allow(clippy::too_many_arguments)]
pub fn ssim_picture(
    pool: &Arc<ThreadPool>,
    mode: StructSimMode,
    window: usize,
    stride: usize,
    use_margin: bool,
    calc_luminance: bool,
    tst: &PicP,
    refr: &PicP,
    spherical: bool,
    lat_range_rad: f64,
    component_weights: Option<&[i32]>,
) -> MetricsResult<SsimResult> {
    let num_components = tst.num_components();
    let height = tst.height();
    let width = tst.width();
    let max_pel = tst.max_pel() as u32;
    let filter_range = window / 2;
    let is_block = matches!(mode, StructSimMode::BlockGaussianInt | StructSimMode::BlockAveraged);

    if !is_block && use_margin && (tst.margin() < filter_range || refr.margin() < filter_range) {
        return Err(MetricsError::IncompatibleLayout(
            "useMargin scan requires margin >= window / 2",
        ));
    }

    let (y_positions, x_positions): (Vec<usize>, Vec<usize>) = if is_block {
        (
            axis_positions_block(height, window, stride),
            axis_positions_block(width, window, stride),
        )
    } else {
        let (y_beg, y_end) = if use_margin {
            (0, height)
        } else {
            (filter_range, height.saturating_sub(filter_range))
        };
        let (x_beg, x_end) = if use_margin {
            (0, width)
        } else {
            (filter_range, width.saturating_sub(filter_range))
        };
        (axis_positions(y_beg, y_end, stride), axis_positions(x_beg, x_end, stride))
    };

    if y_positions.is_empty() || x_positions.is_empty() {
        return Ok(SsimResult {
            per_component: [0.0; 4],
            picture: 0.0,
            any_fake: true,
        });
    }

    let tst_arc = Arc::new(tst.clone());
    let ref_arc = Arc::new(refr.clone());
    let first_error: Arc<Mutex<Option<StructSimError>>> = Arc::new(Mutex::new(None));

    let mut per_component = [0f64; 4];
    let mut any_fake = false;
    for c in 0..num_components {
        let row_sums: Arc<Mutex<Vec<f64>>> = Arc::new(Mutex::new(vec![0.0; y_positions.len()]));
        let row_weights: Arc<Mutex<Vec<f64>>> = Arc::new(Mutex::new(vec![0.0; y_positions.len()]));
        let mut ti = ThPI::new(Arc::clone(pool), y_positions.len().max(1));

        for (row_idx, &y_pos) in y_positions.iter().enumerate() {
            let tst_arc = Arc::clone(&tst_arc);
            let ref_arc = Arc::clone(&ref_arc);
            let x_positions = x_positions.clone();
            let row_sums = Arc::clone(&row_sums);
            let row_weights = Arc::clone(&row_weights);
            let first_error = Arc::clone(&first_error);
            let w = if spherical {
                (((y_pos as f64 + 0.5) / height as f64 - 0.5) * lat_range_rad).cos()
            } else {
                1.0
            };
            let origin_y = if is_block {
                y_pos as isize
            } else {
                y_pos as isize - filter_range as isize
            };

            ti.add_waiting_task(0, move |_thread_idx| {
                let mut acc = Kbns::new();
                for &x_pos in &x_positions {
                    let origin_x = if is_block {
                        x_pos as isize
                    } else {
                        x_pos as isize - filter_range as isize
                    };
                    let test_start = window_offset(&tst_arc, origin_x, origin_y);
                    let ref_start = window_offset(&ref_arc, origin_x, origin_y);
                    let test_slice = &tst_arc.plane(c)[test_start..];
                    let ref_slice = &ref_arc.plane(c)[ref_start..];
                    match calc_wnd(
                        mode,
                        window,
                        test_slice,
                        tst_arc.stride(),
                        ref_slice,
                        ref_arc.stride(),
                        max_pel,
                        calc_luminance,
                    ) {
                        Ok(v) => acc.add(v * w),
                        Err(e) => *first_error.lock() = Some(e),
                    }
                }
                row_sums.lock()[row_idx] = acc.sum();
                row_weights.lock()[row_idx] = w * x_positions.len() as f64;
            })?;
        }
        ti.wait_until_finished_all();

        if let Some(e) = first_error.lock().take() {
            return Err(e.into());
        }

        let mut total = Kbns::new();
        total.extend(row_sums.lock().iter().copied());
        let mut weight_total = Kbns::new();
        weight_total.extend(row_weights.lock().iter().copied());

        let weight_sum = weight_total.sum();
        if weight_sum == 0.0 {
            any_fake = true;
            per_component[c] = 0.0;
        } else {
            per_component[c] = total.sum() / weight_sum;
        }
    }

    let picture = cmp_weights_average(&per_component[..num_components], component_weights);
    Ok(SsimResult {
        per_component,
        picture,
        any_fake,
    })
}

fn downsample(tst: &PicP, refr: &PicP) -> MetricsResult<(PicP, PicP)> {
    let width = tst.width() / 2;
    let height = tst.height() / 2;
    let margin = tst.margin();
    let num_components = tst.num_components();

    let mut new_tst = PicP::new(width, height, tst.bit_depth(), margin, num_components, tst.chroma_format());
    let mut new_ref = PicP::new(width, height, refr.bit_depth(), margin, num_components, refr.chroma_format());

    for (src, dst) in [(tst, &mut new_tst), (refr, &mut new_ref)] {
        for c in 0..num_components {
            let src_origin = src.origin_offset();
            let dst_origin = dst.origin_offset();
            let src_stride = src.stride();
            let dst_stride = dst.stride();
            let mut dst_buf = vec![0u16; dst.plane(c).len()];
            pixelops::downsample_hv(
                &mut dst_buf[dst_origin..],
                &src.plane(c)[src_origin..],
                dst_stride,
                src_stride,
                width,
                height,
            );
            dst.plane_mut(c).copy_from_slice(&dst_buf);
        }
    }
    new_tst.extend();
    new_ref.extend();
    Ok((new_tst, new_ref))
}

const MS_SSIM_SCALE_WEIGHTS: [f64; 5] = [0.0448, 0.2856, 0.3001, 0.2363, 0.1333];

/// Five-scale MS-SSIM: recursive 2x2-box downsampling, only the coarsest
/// scale includes the luminance factor, per-component scores rectified to
/// `[0, inf)` before the weighted product.
#[allow(clippy::too_many_arguments)]
pub fn ms_ssim(
    pool: &Arc<ThreadPool>,
    mode: StructSimMode,
    window: usize,
    stride: usize,
    use_margin: bool,
    tst: &PicP,
    refr: &PicP,
    spherical: bool,
    lat_range_rad: f64,
    component_weights: Option<&[i32]>,
) -> MetricsResult<SsimResult> {
    let num_components = tst.num_components();
    let mut cur_tst = tst.clone();
    let mut cur_ref = refr.clone();

    let mut ms_per_component = [1.0f64; 4];
    let mut any_fake = false;
    let last_scale = MS_SSIM_SCALE_WEIGHTS.len() - 1;

    for (scale, &alpha) in MS_SSIM_SCALE_WEIGHTS.iter().enumerate() {
        let calc_luminance = scale == last_scale;
        let result = ssim_picture(
            pool,
            mode,
            window,
            stride,
            use_margin,
            calc_luminance,
            &cur_tst,
            &cur_ref,
            spherical,
            lat_range_rad,
            None,
        )?;
        any_fake |= result.any_fake;
        for c in 0..num_components {
            ms_per_component[c] *= result.per_component[c].max(0.0).powf(alpha);
        }

        if scale != last_scale {
            let (next_tst, next_ref) = downsample(&cur_tst, &cur_ref)?;
            cur_tst = next_tst;
            cur_ref = next_ref;
        }
    }

    let picture = cmp_weights_average(&ms_per_component[..num_components], component_weights);
    Ok(SsimResult {
        per_component: ms_per_component,
        picture,
        any_fake,
    })
}

/// IV-SSIM / IV-MS-SSIM: SSIM (or MS-SSIM, per `multi_scale`) against each
/// shift-compensated picture, componentwise minimum of the two directions,
/// picture-level minimum of the two direction averages.
#[allow(clippy::too_many_arguments)]
pub fn iv_ssim(
    pool: &Arc<ThreadPool>,
    mode: StructSimMode,
    window: usize,
    stride: usize,
    use_margin: bool,
    multi_scale: bool,
    tst: &PicP,
    refr: &PicP,
    ref_scp: &PicP,
    tst_scp: &PicP,
    spherical: bool,
    lat_range_rad: f64,
    component_weights: Option<&[i32]>,
) -> MetricsResult<SsimResult> {
    let num_components = tst.num_components();

    let compute_one = |a: &PicP, b: &PicP| -> MetricsResult<SsimResult> {
        if multi_scale {
            ms_ssim(
                pool,
                mode,
                window,
                stride,
                use_margin,
                a,
                b,
                spherical,
                lat_range_rad,
                component_weights,
            )
        } else {
            ssim_picture(
                pool,
                mode,
                window,
                stride,
                use_margin,
                true,
                a,
                b,
                spherical,
                lat_range_rad,
                component_weights,
            )
        }
    };

    let t2r = compute_one(tst, ref_scp)?;
    let r2t = compute_one(refr, tst_scp)?;

    let mut per_component = [0f64; 4];
    for c in 0..num_components {
        per_component[c] = t2r.per_component[c].min(r2t.per_component[c]);
    }

    Ok(SsimResult {
        per_component,
        picture: t2r.picture.min(r2t.picture),
        any_fake: t2r.any_fake || r2t.any_fake,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use picture::ChromaFormat;

    fn gradient_pic(width: usize, height: usize, margin: usize) -> PicP {
        let mut pic = PicP::new(width, height, 8, margin, 1, ChromaFormat::Mono400);
        for y in 0..height {
            for x in 0..width {
                pic.set(0, x, y, ((x + y) % 256) as u16);
            }
        }
        pic.extend();
        pic
    }

    #[test]
    fn identical_pictures_score_near_one() {
        let pool = ThreadPool::new(2, 16);
        let pic = gradient_pic(32, 32, 6);
        let result = ssim_picture(
            &pool,
            StructSimMode::RegularAveraged,
            11,
            4,
            false,
            true,
            &pic,
            &pic,
            false,
            std::f64::consts::PI,
            None,
        )
        .unwrap();
        assert!((result.picture - 1.0).abs() < 1e-9);
        pool.destroy();
    }

    #[test]
    fn ms_ssim_identical_pictures_score_near_one() {
        let pool = ThreadPool::new(2, 16);
        let pic = gradient_pic(64, 64, 6);
        let result = ms_ssim(
            &pool,
            StructSimMode::RegularAveraged,
            11,
            4,
            false,
            &pic,
            &pic,
            false,
            std::f64::consts::PI,
            None,
        )
        .unwrap();
        assert!((result.picture - 1.0).abs() < 1e-6, "{}", result.picture);
        pool.destroy();
    }

    #[test]
    fn block_mode_identical_pictures_score_near_one() {
        let pool = ThreadPool::new(2, 16);
        let pic = gradient_pic(32, 32, 0);
        let result = ssim_picture(
            &pool,
            StructSimMode::BlockAveraged,
            8,
            8,
            false,
            true,
            &pic,
            &pic,
            false,
            std::f64::consts::PI,
            None,
        )
        .unwrap();
        assert!((result.picture - 1.0).abs() < 1e-9);
        pool.destroy();
    }
}
