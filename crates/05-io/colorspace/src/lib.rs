//! The `ColorConverter` collaborator: full-range integer YCbCr<->RGB
//! conversion between a raw sequence's input color space and the color
//! space a metric is configured to measure in.

mod error;
mod matrices;

pub use error::{ColorError, ColorResult};

use picture::PicP;

/// Color space a raw sequence (or a metric's measurement domain) can be in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColorSpace {
    Rgb,
    YCbCrBt601,
    YCbCrSmpte170M,
    YCbCrBt709,
    YCbCrSmpte240M,
    YCbCrBt2020,
}

/// Converts a picture between color spaces at its own bit depth.
pub trait ColorConverter {
    fn convert(&self, pic: &PicP, from: ColorSpace, to: ColorSpace) -> ColorResult<PicP>;
}

/// The one concrete converter this crate ships: full-range integer
/// matrices for every [`ColorSpace`] pair, selected by `Kr`/`Kb`.
#[derive(Clone, Copy, Debug, Default)]
pub struct MatrixColorConverter;

impl MatrixColorConverter {
    fn rgb_to_ycbcr(&self, pic: &PicP, kr: f64, kb: f64) -> ColorResult<PicP> {
        if pic.num_components() != 3 {
            return Err(ColorError::ComponentCountMismatch(pic.num_components()));
        }
        let kg = 1.0 - kr - kb;
        let max_pel = pic.max_pel() as f64;
        let half = (max_pel + 1.0) / 2.0;
        let mut out = PicP::new(
            pic.width(),
            pic.height(),
            pic.bit_depth(),
            pic.margin(),
            3,
            pic.chroma_format(),
        );
        for y in 0..pic.height() {
            for x in 0..pic.width() {
                let r = pic.get(0, x, y) as f64;
                let g = pic.get(1, x, y) as f64;
                let b = pic.get(2, x, y) as f64;
                let yy = kr * r + kg * g + kb * b;
                let cb = (b - yy) / (2.0 * (1.0 - kb)) + half;
                let cr = (r - yy) / (2.0 * (1.0 - kr)) + half;
                out.set(0, x, y, yy.round().clamp(0.0, max_pel) as u16);
                out.set(1, x, y, cb.round().clamp(0.0, max_pel) as u16);
                out.set(2, x, y, cr.round().clamp(0.0, max_pel) as u16);
            }
        }
        if pic.is_margin_extended() {
            out.extend();
        }
        Ok(out)
    }

    fn ycbcr_to_rgb(&self, pic: &PicP, kr: f64, kb: f64) -> ColorResult<PicP> {
        if pic.num_components() != 3 {
            return Err(ColorError::ComponentCountMismatch(pic.num_components()));
        }
        let kg = 1.0 - kr - kb;
        let max_pel = pic.max_pel() as f64;
        let half = (max_pel + 1.0) / 2.0;
        let mut out = PicP::new(
            pic.width(),
            pic.height(),
            pic.bit_depth(),
            pic.margin(),
            3,
            pic.chroma_format(),
        );
        for y in 0..pic.height() {
            for x in 0..pic.width() {
                let yy = pic.get(0, x, y) as f64;
                let cb = pic.get(1, x, y) as f64 - half;
                let cr = pic.get(2, x, y) as f64 - half;
                let r = yy + 2.0 * (1.0 - kr) * cr;
                let b = yy + 2.0 * (1.0 - kb) * cb;
                let g = (yy - kr * r - kb * b) / kg;
                out.set(0, x, y, r.round().clamp(0.0, max_pel) as u16);
                out.set(1, x, y, g.round().clamp(0.0, max_pel) as u16);
                out.set(2, x, y, b.round().clamp(0.0, max_pel) as u16);
            }
        }
        if pic.is_margin_extended() {
            out.extend();
        }
        Ok(out)
    }
}

impl ColorConverter for MatrixColorConverter {
    fn convert(&self, pic: &PicP, from: ColorSpace, to: ColorSpace) -> ColorResult<PicP> {
        if from == to {
            return Ok(pic.clone());
        }
        match (matrices::coefficients(from), matrices::coefficients(to)) {
            (None, Some((kr, kb))) => self.rgb_to_ycbcr(pic, kr, kb),
            (Some((kr, kb)), None) => self.ycbcr_to_rgb(pic, kr, kb),
            (Some((kr_from, kb_from)), Some(_)) => {
                let rgb = self.ycbcr_to_rgb(pic, kr_from, kb_from)?;
                let (kr_to, kb_to) = matrices::coefficients(to).expect("checked Some above");
                self.rgb_to_ycbcr(&rgb, kr_to, kb_to)
            }
            (None, None) => Ok(pic.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use picture::ChromaFormat;

    fn rgb_pic(r: u16, g: u16, b: u16) -> PicP {
        let mut p = PicP::new(2, 2, 8, 0, 3, ChromaFormat::Yuv444);
        for y in 0..2 {
            for x in 0..2 {
                p.set(0, x, y, r);
                p.set(1, x, y, g);
                p.set(2, x, y, b);
            }
        }
        p
    }

    #[test]
    fn identity_conversion_is_a_clone() {
        let pic = rgb_pic(10, 20, 30);
        let converter = MatrixColorConverter;
        let out = converter.convert(&pic, ColorSpace::Rgb, ColorSpace::Rgb).unwrap();
        assert!(out.equal(&pic, false));
    }

    #[test]
    fn gray_rgb_maps_to_zero_chroma() {
        let pic = rgb_pic(128, 128, 128);
        let converter = MatrixColorConverter;
        let ycbcr = converter.convert(&pic, ColorSpace::Rgb, ColorSpace::YCbCrBt709).unwrap();
        assert_eq!(ycbcr.get(0, 0, 0), 128);
        assert_eq!(ycbcr.get(1, 0, 0), 128);
        assert_eq!(ycbcr.get(2, 0, 0), 128);
    }

    #[test]
    fn round_trip_recovers_original_within_rounding() {
        let pic = rgb_pic(200, 60, 30);
        let converter = MatrixColorConverter;
        let ycbcr = converter.convert(&pic, ColorSpace::Rgb, ColorSpace::YCbCrBt601).unwrap();
        let back = converter.convert(&ycbcr, ColorSpace::YCbCrBt601, ColorSpace::Rgb).unwrap();
        for c in 0..3 {
            let orig = pic.get(c, 0, 0) as i32;
            let round_tripped = back.get(c, 0, 0) as i32;
            assert!((orig - round_tripped).abs() <= 1);
        }
    }

    #[test]
    fn rejects_non_three_component_pictures() {
        let pic = PicP::new(2, 2, 8, 0, 1, ChromaFormat::Mono400);
        let converter = MatrixColorConverter;
        assert!(converter.convert(&pic, ColorSpace::Rgb, ColorSpace::YCbCrBt601).is_err());
    }
}
