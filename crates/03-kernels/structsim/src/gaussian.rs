use std::sync::OnceLock;

use crate::error::{StructSimError, StructSimResult};

/// A Gaussian weight table for one window size, in both representations
/// the five modes need: float weights summing to 1 (up to rounding), and
/// fixed-point weights summing exactly to `1 << 18`.
pub(crate) struct GaussianTable {
    pub(crate) float_weights: Vec<f64>,
    pub(crate) int_weights: Vec<i64>,
}

const INT_SCALE: i64 = 1 << 18;

fn sigma_for_window(window: usize) -> f64 {
    // The reference 11x11 window uses sigma=1.5; block windows scale the
    // same ratio so the kernel stays proportionally as wide.
    1.5 * window as f64 / 11.0
}

fn build(window: usize) -> GaussianTable {
    let sigma = sigma_for_window(window);
    let center = (window as f64 - 1.0) / 2.0;
    let mut raw = vec![0f64; window * window];
    let mut sum = 0f64;
    for y in 0..window {
        for x in 0..window {
            let dx = x as f64 - center;
            let dy = y as f64 - center;
            let v = (-(dx * dx + dy * dy) / (2.0 * sigma * sigma)).exp();
            raw[y * window + x] = v;
            sum += v;
        }
    }
    let float_weights: Vec<f64> = raw.iter().map(|v| v / sum).collect();

    let mut int_weights: Vec<i64> = float_weights
        .iter()
        .map(|w| (w * INT_SCALE as f64).round() as i64)
        .collect();
    let total: i64 = int_weights.iter().sum();
    let residual = INT_SCALE - total;
    if residual != 0 {
        let (center_idx, _) = int_weights
            .iter()
            .enumerate()
            .max_by_key(|(_, &v)| v)
            .expect("window is non-empty");
        int_weights[center_idx] += residual;
    }

    GaussianTable {
        float_weights,
        int_weights,
    }
}

static GAUSS_8: OnceLock<GaussianTable> = OnceLock::new();
static GAUSS_11: OnceLock<GaussianTable> = OnceLock::new();
static GAUSS_16: OnceLock<GaussianTable> = OnceLock::new();

pub(crate) fn table_for_window(window: usize) -> StructSimResult<&'static GaussianTable> {
    match window {
        8 => Ok(GAUSS_8.get_or_init(|| build(8))),
        11 => Ok(GAUSS_11.get_or_init(|| build(11))),
        16 => Ok(GAUSS_16.get_or_init(|| build(16))),
        other => Err(StructSimError::UnsupportedWindow(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_weights_sum_exactly_to_scale() {
        for window in [8, 11, 16] {
            let table = table_for_window(window).unwrap();
            let sum: i64 = table.int_weights.iter().sum();
            assert_eq!(sum, INT_SCALE);
        }
    }

    #[test]
    fn float_weights_sum_close_to_one() {
        for window in [8, 11, 16] {
            let table = table_for_window(window).unwrap();
            let sum: f64 = table.float_weights.iter().sum();
            assert!((sum - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn rejects_unsupported_window() {
        assert!(table_for_window(32).is_err());
    }

    #[test]
    fn peak_weight_sits_at_center() {
        let table = table_for_window(11).unwrap();
        let center_idx = 5 * 11 + 5;
        let peak = table
            .float_weights
            .iter()
            .cloned()
            .fold(f64::MIN, f64::max);
        assert_eq!(table.float_weights[center_idx], peak);
    }
}
