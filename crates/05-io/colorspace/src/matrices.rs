use crate::ColorSpace;

/// `(Kr, Kb)` luma coefficients for each YCbCr variant; `Kg = 1 - Kr - Kb`.
pub(crate) fn coefficients(space: ColorSpace) -> Option<(f64, f64)> {
    match space {
        ColorSpace::Rgb => None,
        ColorSpace::YCbCrBt601 | ColorSpace::YCbCrSmpte170M => Some((0.299, 0.114)),
        ColorSpace::YCbCrBt709 => Some((0.2126, 0.0722)),
        ColorSpace::YCbCrSmpte240M => Some((0.212, 0.087)),
        ColorSpace::YCbCrBt2020 => Some((0.2627, 0.0593)),
    }
}
