//! The `Config` collaborator: a TOML-backed `MetricsConfig`, resolved from
//! a textual [`RawMetricsConfig`] and validated against the picture/kernel
//! crates' own constraints before the driver ever opens a sequence.
//!
//! TOML is a deliberate format switch from the original engine's INI files
//! — the field set and semantics below are unchanged, only the surface
//! syntax differs (see `DESIGN.md`).

mod action;
mod error;

pub use action::PelAction;
pub use error::{ConfigError, ConfigResult};

use std::path::Path;

use colorspace::ColorSpace;
use picture::ChromaFormat;
use seqio::PixelLayout;
use serde::Deserialize;
use structsim::StructSimMode;

/// Which metrics a run should compute; one bit per spec.md `CalcMetric[m]`.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
pub struct CalcMetricConfig {
    #[serde(default)]
    pub psnr: bool,
    #[serde(default)]
    pub ws_psnr: bool,
    #[serde(default)]
    pub iv_psnr: bool,
    #[serde(default)]
    pub ssim: bool,
    #[serde(default)]
    pub ms_ssim: bool,
    #[serde(default)]
    pub iv_ssim: bool,
    #[serde(default)]
    pub iv_ms_ssim: bool,
}

impl CalcMetricConfig {
    pub fn any_enabled(&self) -> bool {
        self.psnr || self.ws_psnr || self.iv_psnr || self.ssim || self.ms_ssim || self.iv_ssim || self.iv_ms_ssim
    }

    pub fn any_iv(&self) -> bool {
        self.iv_psnr || self.iv_ssim || self.iv_ms_ssim
    }

    pub fn any_ssim_family(&self) -> bool {
        self.ssim || self.ms_ssim || self.iv_ssim || self.iv_ms_ssim
    }
}

/// As-written TOML representation; every color/format/action field is a
/// plain string here and gets resolved into a typed value by
/// [`RawMetricsConfig::resolve`].
#[derive(Clone, Debug, Deserialize)]
pub struct RawMetricsConfig {
    pub input_file_test: String,
    pub input_file_reference: String,
    #[serde(default)]
    pub input_file_mask: Option<String>,

    pub file_format: String,
    pub picture_width: usize,
    pub picture_height: usize,
    pub bit_depth: u32,
    pub chroma_format: String,

    #[serde(default)]
    pub start_frame_test: usize,
    #[serde(default)]
    pub start_frame_reference: usize,
    pub number_of_frames: usize,

    pub calc_metric: CalcMetricConfig,

    pub color_space_input: String,
    pub color_space_metric: String,

    #[serde(default = "default_search_range")]
    pub search_range: i32,
    #[serde(default = "default_weights")]
    pub cmp_weights_search: [i32; 4],
    #[serde(default = "default_weights")]
    pub cmp_weights_average: [i32; 4],
    #[serde(default)]
    pub unnoticeable_coef: [f64; 4],

    #[serde(default = "default_struct_sim_mode")]
    pub struct_sim_mode: String,
    #[serde(default = "default_struct_sim_stride")]
    pub struct_sim_stride: usize,
    #[serde(default = "default_struct_sim_window")]
    pub struct_sim_window: usize,

    #[serde(default)]
    pub is_equirectangular: bool,
    #[serde(default)]
    pub lon_range_deg: f64,
    #[serde(default)]
    pub lat_range_deg: f64,

    #[serde(default = "default_action")]
    pub invalid_pel_actn: String,
    #[serde(default = "default_action")]
    pub name_mismatch_actn: String,

    #[serde(default)]
    pub number_of_threads: usize,
    #[serde(default)]
    pub verbose_level: u8,
}

fn default_search_range() -> i32 {
    2
}
fn default_weights() -> [i32; 4] {
    [1, 0, 0, 0]
}
fn default_struct_sim_mode() -> String {
    "RegularGaussianInt".to_string()
}
fn default_struct_sim_stride() -> usize {
    1
}
fn default_struct_sim_window() -> usize {
    11
}
fn default_action() -> String {
    "WARN".to_string()
}

fn parse_chroma(raw: &str) -> ConfigResult<ChromaFormat> {
    match raw.replace([':', '-'], "").as_str() {
        "400" => Ok(ChromaFormat::Mono400),
        "420" => Ok(ChromaFormat::Yuv420),
        "422" => Ok(ChromaFormat::Yuv422),
        "444" => Ok(ChromaFormat::Yuv444),
        other => Err(ConfigError::InvalidField {
            field: "chroma_format",
            reason: format!("expected 4:0:0/4:2:0/4:2:2/4:4:4, got '{other}'"),
        }),
    }
}

fn parse_file_format(raw: &str) -> ConfigResult<PixelLayout> {
    match raw.to_ascii_lowercase().as_str() {
        "planar" => Ok(PixelLayout::Planar),
        "interleaved" => Ok(PixelLayout::Interleaved),
        other => Err(ConfigError::InvalidField {
            field: "file_format",
            reason: format!("expected planar/interleaved, got '{other}'"),
        }),
    }
}

fn parse_color_space(field: &'static str, raw: &str) -> ConfigResult<ColorSpace> {
    match raw.to_ascii_uppercase().replace('_', "").as_str() {
        "RGB" => Ok(ColorSpace::Rgb),
        "YCBCR" | "YCBCRBT601" => Ok(ColorSpace::YCbCrBt601),
        "YCBCRSMPTE170M" => Ok(ColorSpace::YCbCrSmpte170M),
        "YCBCRBT709" => Ok(ColorSpace::YCbCrBt709),
        "YCBCRSMPTE240M" => Ok(ColorSpace::YCbCrSmpte240M),
        "YCBCRBT2020" => Ok(ColorSpace::YCbCrBt2020),
        other => Err(ConfigError::InvalidField {
            field,
            reason: format!("unrecognized color space '{other}'"),
        }),
    }
}

/// Validated, fully-typed configuration the driver consumes.
#[derive(Clone, Debug)]
pub struct MetricsConfig {
    pub input_file_test: String,
    pub input_file_reference: String,
    pub input_file_mask: Option<String>,

    pub pixel_layout: PixelLayout,
    pub picture_width: usize,
    pub picture_height: usize,
    pub bit_depth: u32,
    pub chroma_format: ChromaFormat,

    pub start_frame_test: usize,
    pub start_frame_reference: usize,
    pub number_of_frames: usize,

    pub calc_metric: CalcMetricConfig,

    pub color_space_input: ColorSpace,
    pub color_space_metric: ColorSpace,

    pub search_range: i32,
    pub cmp_weights_search: [i32; 4],
    pub cmp_weights_average: [i32; 4],
    pub unnoticeable_coef: [f64; 4],

    pub struct_sim_mode: StructSimMode,
    pub struct_sim_stride: usize,
    pub struct_sim_window: usize,

    pub is_equirectangular: bool,
    pub lon_range_deg: f64,
    pub lat_range_deg: f64,

    pub invalid_pel_actn: PelAction,
    pub name_mismatch_actn: PelAction,

    pub number_of_threads: usize,
    pub verbose_level: u8,
}

impl RawMetricsConfig {
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Ok(toml::from_str(&text)?)
    }

    /// Parses every textual field and checks the cross-field invariants
    /// (bit depth range, search-range-vs-margin, window-vs-mode) that can't
    /// be expressed as plain `serde` constraints.
    pub fn resolve(self) -> ConfigResult<MetricsConfig> {
        if !(6..=16).contains(&self.bit_depth) {
            return Err(ConfigError::InvalidField {
                field: "bit_depth",
                reason: format!("must be in 6..=16, got {}", self.bit_depth),
            });
        }
        if !self.calc_metric.any_enabled() {
            return Err(ConfigError::InvalidField {
                field: "calc_metric",
                reason: "at least one metric must be enabled".to_string(),
            });
        }
        if self.calc_metric.any_iv() && self.search_range < 0 {
            return Err(ConfigError::SearchRangeTooLarge {
                search_range: self.search_range,
            });
        }

        let struct_sim_mode = StructSimMode::from_name(&self.struct_sim_mode).ok_or_else(|| ConfigError::InvalidField {
            field: "struct_sim_mode",
            reason: format!("unrecognized mode '{}'", self.struct_sim_mode),
        })?;
        if self.calc_metric.any_ssim_family() {
            struct_sim_mode.validate_window(self.struct_sim_window).map_err(|source| ConfigError::InvalidField {
                field: "struct_sim_window",
                reason: format!("incompatible with struct_sim_mode '{}': {source}", self.struct_sim_mode),
            })?;
        }

        Ok(MetricsConfig {
            input_file_test: self.input_file_test,
            input_file_reference: self.input_file_reference,
            input_file_mask: self.input_file_mask,
            pixel_layout: parse_file_format(&self.file_format)?,
            picture_width: self.picture_width,
            picture_height: self.picture_height,
            bit_depth: self.bit_depth,
            chroma_format: parse_chroma(&self.chroma_format)?,
            start_frame_test: self.start_frame_test,
            start_frame_reference: self.start_frame_reference,
            number_of_frames: self.number_of_frames,
            calc_metric: self.calc_metric,
            color_space_input: parse_color_space("color_space_input", &self.color_space_input)?,
            color_space_metric: parse_color_space("color_space_metric", &self.color_space_metric)?,
            search_range: self.search_range,
            cmp_weights_search: self.cmp_weights_search,
            cmp_weights_average: self.cmp_weights_average,
            unnoticeable_coef: self.unnoticeable_coef,
            struct_sim_mode,
            struct_sim_stride: self.struct_sim_stride,
            struct_sim_window: self.struct_sim_window,
            is_equirectangular: self.is_equirectangular,
            lon_range_deg: self.lon_range_deg,
            lat_range_deg: self.lat_range_deg,
            invalid_pel_actn: PelAction::parse("invalid_pel_actn", &self.invalid_pel_actn)?,
            name_mismatch_actn: PelAction::parse("name_mismatch_actn", &self.name_mismatch_actn)?,
            number_of_threads: self.number_of_threads,
            verbose_level: self.verbose_level,
        })
    }
}

impl MetricsConfig {
    /// Loads and resolves a config file in one step.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        RawMetricsConfig::load(path)?.resolve()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_toml() -> &'static str {
        r#"
        input_file_test = "test.yuv"
        input_file_reference = "ref.yuv"
        file_format = "planar"
        picture_width = 16
        picture_height = 16
        bit_depth = 8
        chroma_format = "4:0:0"
        number_of_frames = 1
        color_space_input = "YCbCr_BT601"
        color_space_metric = "YCbCr_BT601"

        [calc_metric]
        psnr = true
        "#
    }

    #[test]
    fn resolves_minimal_config() {
        let raw: RawMetricsConfig = toml::from_str(minimal_toml()).unwrap();
        let resolved = raw.resolve().unwrap();
        assert_eq!(resolved.picture_width, 16);
        assert_eq!(resolved.chroma_format, ChromaFormat::Mono400);
        assert_eq!(resolved.pixel_layout, PixelLayout::Planar);
        assert_eq!(resolved.search_range, 2);
        assert_eq!(resolved.invalid_pel_actn, PelAction::Warn);
    }

    #[test]
    fn rejects_unrecognized_chroma_format() {
        let mut raw: RawMetricsConfig = toml::from_str(minimal_toml()).unwrap();
        raw.chroma_format = "4:1:1".to_string();
        assert!(raw.resolve().is_err());
    }

    #[test]
    fn rejects_config_with_no_metrics_enabled() {
        let mut raw: RawMetricsConfig = toml::from_str(minimal_toml()).unwrap();
        raw.calc_metric = CalcMetricConfig::default();
        assert!(raw.resolve().is_err());
    }

    #[test]
    fn rejects_out_of_range_bit_depth() {
        let mut raw: RawMetricsConfig = toml::from_str(minimal_toml()).unwrap();
        raw.bit_depth = 20;
        assert!(raw.resolve().is_err());
    }

    #[test]
    fn rejects_window_mode_mismatch_when_ssim_enabled() {
        let mut raw: RawMetricsConfig = toml::from_str(minimal_toml()).unwrap();
        raw.calc_metric.ssim = true;
        raw.struct_sim_mode = "BlockAveraged".to_string();
        raw.struct_sim_window = 11;
        assert!(raw.resolve().is_err());
    }

    #[test]
    fn ignores_window_mode_mismatch_when_ssim_disabled() {
        let mut raw: RawMetricsConfig = toml::from_str(minimal_toml()).unwrap();
        raw.struct_sim_mode = "BlockAveraged".to_string();
        raw.struct_sim_window = 11;
        assert!(raw.resolve().is_ok());
    }
}
