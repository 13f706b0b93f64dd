//! The frame-by-frame driver: fetches frames from a [`SequenceIO`], validates
//! and preprocesses them, dispatches every enabled metric onto the shared
//! pool, and hands the accumulated [`MetricStat`]s to a [`Reporter`].

use std::sync::Arc;

use colorspace::{ColorConverter, ColorSpace, MatrixColorConverter};
use ivmetrics::{iv_psnr, iv_ssim, ms_ssim, plain_psnr, ssim_picture, MetricKind, MetricStat};
use picture::PicP;
use qmiv_config::{CalcMetricConfig, MetricsConfig, PelAction};
use report::Reporter;
use seqio::{FrameSet, SequenceIO};
use threadpool::ThreadPool;

use crate::error::{AppError, AppResult};

/// Margin every input picture must carry for the configured metric set:
/// the larger of the IV search range and half the SSIM window.
pub fn required_margin(config: &MetricsConfig) -> usize {
    let search_margin = if config.calc_metric.any_iv() {
        config.search_range.max(0) as usize
    } else {
        0
    };
    let ssim_margin = if config.calc_metric.any_ssim_family() {
        config.struct_sim_window / 2
    } else {
        0
    };
    search_margin.max(ssim_margin)
}

fn enabled_metric_kinds(calc: &CalcMetricConfig) -> Vec<MetricKind> {
    let mut kinds = Vec::new();
    if calc.psnr {
        kinds.push(MetricKind::Psnr);
    }
    if calc.ws_psnr {
        kinds.push(MetricKind::WsPsnr);
    }
    if calc.iv_psnr {
        kinds.push(MetricKind::IvPsnr);
    }
    if calc.ssim {
        kinds.push(MetricKind::Ssim);
    }
    if calc.ms_ssim {
        kinds.push(MetricKind::MsSsim);
    }
    if calc.iv_ssim {
        kinds.push(MetricKind::IvSsim);
    }
    if calc.iv_ms_ssim {
        kinds.push(MetricKind::IvMsSsim);
    }
    kinds
}

/// Applies `InvalidPelActn` to `pic`: conceals (clips) out-of-range pels,
/// warns and leaves them, or aborts with [`AppError::RangeError`].
fn validate_pels(frame: usize, which: &'static str, pic: &mut PicP, action: PelAction) -> AppResult<()> {
    match pic.check(which) {
        Ok(()) => Ok(()),
        Err(source) => match action {
            PelAction::Conceal => {
                log::warn!("frame {frame}: concealing out-of-range pels in '{which}'");
                pic.conceal();
                Ok(())
            }
            PelAction::Warn => {
                log::warn!("frame {frame}: out-of-range pels in '{which}': {source}");
                Ok(())
            }
            PelAction::Abort => Err(AppError::RangeError { frame, which, source }),
        },
    }
}

/// Orchestrates one metric run end to end over a [`SequenceIO`].
pub struct Driver<S: SequenceIO> {
    config: MetricsConfig,
    pool: Arc<ThreadPool>,
    sequence_io: S,
    color_converter: MatrixColorConverter,
    stats: Vec<MetricStat>,
}

impl<S: SequenceIO> Driver<S> {
    pub fn new(config: MetricsConfig, sequence_io: S) -> Self {
        let num_workers = if config.number_of_threads == 0 {
            std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
        } else {
            config.number_of_threads
        };
        let pool = ThreadPool::new(num_workers, 64);
        let kinds = enabled_metric_kinds(&config.calc_metric);
        let num_components = if matches!(config.chroma_format, picture::ChromaFormat::Mono400) {
            1
        } else {
            3
        };
        let stats = kinds.into_iter().map(|kind| MetricStat::new(kind, num_components)).collect();
        Self {
            config,
            pool,
            sequence_io,
            color_converter: MatrixColorConverter,
            stats,
        }
    }

    fn stat_mut(&mut self, kind: MetricKind) -> Option<&mut MetricStat> {
        self.stats.iter_mut().find(|s| s.kind() == kind)
    }

    fn preprocess(&self, frame: usize, frames: FrameSet) -> AppResult<FrameSet> {
        let FrameSet { mut test, mut reference, mask } = frames;

        validate_pels(frame, "test", &mut test, self.config.invalid_pel_actn)?;
        validate_pels(frame, "reference", &mut reference, self.config.invalid_pel_actn)?;
        if !test.is_margin_extended() {
            test.extend();
        }
        if !reference.is_margin_extended() {
            reference.extend();
        }

        let (test, reference) = if self.config.color_space_input != self.config.color_space_metric {
            (
                self.convert(&test, self.config.color_space_input, self.config.color_space_metric)?,
                self.convert(&reference, self.config.color_space_input, self.config.color_space_metric)?,
            )
        } else {
            (test, reference)
        };

        Ok(FrameSet { test, reference, mask })
    }

    fn convert(&self, pic: &PicP, from: ColorSpace, to: ColorSpace) -> AppResult<PicP> {
        Ok(self.color_converter.convert(pic, from, to)?)
    }

    /// Runs every frame in `[0, numberOfFrames)`, dispatching enabled
    /// metrics and handing the accumulated stats to `reporter`.
    pub fn run(&mut self, reporter: &mut dyn Reporter) -> AppResult<()> {
        let num_frames = self.config.number_of_frames.min(self.sequence_io.num_frames());
        for idx in 0..num_frames {
            log::info!("processing frame {idx}/{num_frames}");
            let frames = self.sequence_io.read_frame(idx)?;
            let FrameSet { test, reference, mask } = self.preprocess(idx, frames)?;
            self.dispatch_frame(idx, &test, &reference, mask.as_ref())?;
        }
        self.pool.destroy();
        reporter.report(&self.stats)?;
        Ok(())
    }

    #[allow(clippy::too_many_lines)]
    fn dispatch_frame(&mut self, frame: usize, test: &PicP, reference: &PicP, mask: Option<&PicP>) -> AppResult<()> {
        let calc = self.config.calc_metric;
        let lat_range_rad = self.config.lat_range_deg.to_radians();
        let weights_average = Some(&self.config.cmp_weights_average[..]);

        if calc.psnr {
            let result = plain_psnr(&self.pool, test, reference, mask, false, lat_range_rad, weights_average)?;
            log::debug!("frame {frame} PSNR picture={}", result.picture);
            if let Some(stat) = self.stat_mut(MetricKind::Psnr) {
                stat.push(&result.per_component, result.picture, result.any_fake);
            }
        }

        if calc.ws_psnr {
            let result = plain_psnr(
                &self.pool,
                test,
                reference,
                mask,
                self.config.is_equirectangular,
                lat_range_rad,
                weights_average,
            )?;
            log::debug!("frame {frame} WS-PSNR picture={}", result.picture);
            if let Some(stat) = self.stat_mut(MetricKind::WsPsnr) {
                stat.push(&result.per_component, result.picture, result.any_fake);
            }
        }

        if calc.any_iv() {
            let color_diff = ivmetrics::glob_clr_diff(&self.pool, reference, test, &self.config.unnoticeable_coef)?;
            let (ref_scp, tst_scp) = ivmetrics::shift_compensate(
                &self.pool,
                reference,
                test,
                self.config.search_range.max(0) as usize,
                &self.config.cmp_weights_search,
                &color_diff,
            )?;

            if calc.iv_psnr {
                let result = iv_psnr(
                    &self.pool,
                    test,
                    reference,
                    &ref_scp,
                    &tst_scp,
                    mask,
                    false,
                    lat_range_rad,
                    weights_average,
                )?;
                log::debug!("frame {frame} IV-PSNR picture={}", result.picture);
                if let Some(stat) = self.stat_mut(MetricKind::IvPsnr) {
                    stat.push(&result.per_component, result.picture, result.any_fake);
                }
            }

            if calc.iv_ssim {
                let result = iv_ssim(
                    &self.pool,
                    self.config.struct_sim_mode,
                    self.config.struct_sim_window,
                    self.config.struct_sim_stride,
                    true,
                    false,
                    test,
                    reference,
                    &ref_scp,
                    &tst_scp,
                    false,
                    lat_range_rad,
                    weights_average,
                )?;
                log::debug!("frame {frame} IV-SSIM picture={}", result.picture);
                if let Some(stat) = self.stat_mut(MetricKind::IvSsim) {
                    stat.push(&result.per_component, result.picture, result.any_fake);
                }
            }

            if calc.iv_ms_ssim {
                let result = iv_ssim(
                    &self.pool,
                    self.config.struct_sim_mode,
                    self.config.struct_sim_window,
                    self.config.struct_sim_stride,
                    true,
                    true,
                    test,
                    reference,
                    &ref_scp,
                    &tst_scp,
                    false,
                    lat_range_rad,
                    weights_average,
                )?;
                log::debug!("frame {frame} IV-MS-SSIM picture={}", result.picture);
                if let Some(stat) = self.stat_mut(MetricKind::IvMsSsim) {
                    stat.push(&result.per_component, result.picture, result.any_fake);
                }
            }
        }

        if calc.ssim {
            let result = ssim_picture(
                &self.pool,
                self.config.struct_sim_mode,
                self.config.struct_sim_window,
                self.config.struct_sim_stride,
                true,
                true,
                test,
                reference,
                false,
                lat_range_rad,
                weights_average,
            )?;
            log::debug!("frame {frame} SSIM picture={}", result.picture);
            if let Some(stat) = self.stat_mut(MetricKind::Ssim) {
                stat.push(&result.per_component, result.picture, result.any_fake);
            }
        }

        if calc.ms_ssim {
            let result = ms_ssim(
                &self.pool,
                self.config.struct_sim_mode,
                self.config.struct_sim_window,
                self.config.struct_sim_stride,
                true,
                test,
                reference,
                false,
                lat_range_rad,
                weights_average,
            )?;
            log::debug!("frame {frame} MS-SSIM picture={}", result.picture);
            if let Some(stat) = self.stat_mut(MetricKind::MsSsim) {
                stat.push(&result.per_component, result.picture, result.any_fake);
            }
        }

        Ok(())
    }
}
