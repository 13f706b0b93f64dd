//! Kahan-Babuska-Neumaier compensated summation.
//!
//! Every metric that averages more than a handful of terms accumulates through
//! [`Kbns`] (or the four-lane [`Kbns4`]) rather than a naive running sum, so
//! that per-frame and per-sequence averages stay reproducible regardless of
//! the order worker threads happen to complete rows in.

/// Running compensated sum over `f64` terms.
///
/// Maintains a sum `s` and a compensation term `c` such that `s + c` is a
/// more accurate estimate of the true sum than `s` alone. The update rule is
/// the Neumaier variant of Kahan summation: it picks up the rounding error
/// regardless of whether the running sum or the new term is larger in
/// magnitude.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Kbns {
    s: f64,
    c: f64,
}

impl Kbns {
    /// Creates an accumulator starting from zero.
    #[inline]
    pub const fn new() -> Self {
        Self { s: 0.0, c: 0.0 }
    }

    /// Folds one term into the running sum.
    #[inline]
    pub fn add(&mut self, v: f64) {
        let t = self.s + v;
        if self.s.abs() >= v.abs() {
            self.c += (self.s - t) + v;
        } else {
            self.c += (v - t) + self.s;
        }
        self.s = t;
    }

    /// Folds every term of an iterator into the running sum.
    pub fn extend(&mut self, values: impl IntoIterator<Item = f64>) {
        for v in values {
            self.add(v);
        }
    }

    /// Returns the compensated total accumulated so far.
    #[inline]
    pub fn sum(&self) -> f64 {
        self.s + self.c
    }

    /// Combines two partial sums, e.g. one accumulated per worker row.
    #[inline]
    pub fn merge(&mut self, other: Kbns) {
        self.add(other.s);
        self.c += other.c;
    }
}

/// Component-wise four-lane extension of [`Kbns`], one lane per picture
/// component (Y, Cb, Cr, and a spare fourth lane).
///
/// A scalar reference implementation is always correct; an architecture with
/// a 256-bit SIMD register could process all four lanes in one instruction,
/// but must produce results identical up to the target's double-precision
/// rounding behaviour, so this type simply runs the scalar update four times.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Kbns4 {
    lanes: [Kbns; 4],
}

impl Kbns4 {
    /// Creates four accumulators starting from zero.
    #[inline]
    pub const fn new() -> Self {
        Self {
            lanes: [Kbns::new(); 4],
        }
    }

    /// Folds one 4-vector into the four running sums.
    #[inline]
    pub fn add(&mut self, v: [f64; 4]) {
        for (lane, value) in self.lanes.iter_mut().zip(v) {
            lane.add(value);
        }
    }

    /// Combines two partial 4-vectors of sums.
    #[inline]
    pub fn merge(&mut self, other: Kbns4) {
        for (lane, other_lane) in self.lanes.iter_mut().zip(other.lanes) {
            lane.merge(*other_lane);
        }
    }

    /// Returns the compensated totals for all four lanes.
    #[inline]
    pub fn sums(&self) -> [f64; 4] {
        [
            self.lanes[0].sum(),
            self.lanes[1].sum(),
            self.lanes[2].sum(),
            self.lanes[3].sum(),
        ]
    }

    /// Returns the compensated total for a single component lane.
    #[inline]
    pub fn sum(&self, component: usize) -> f64 {
        self.lanes[component].sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::seq::SliceRandom;
    use rand::SeedableRng;

    #[test]
    fn identity_sum_is_zero() {
        assert_eq!(Kbns::new().sum(), 0.0);
    }

    #[test]
    fn matches_naive_sum_for_well_scaled_values() {
        let values = [1.0, 2.0, 3.0, 4.5, -0.5];
        let mut acc = Kbns::new();
        acc.extend(values.iter().copied());
        let naive: f64 = values.iter().sum();
        assert!((acc.sum() - naive).abs() < 1e-12);
    }

    #[test]
    fn recovers_precision_naive_summation_loses() {
        // A classic cancellation case: naive summation drops the small terms.
        let mut values = vec![1.0e16, 1.0, -1.0e16];
        values.extend(std::iter::repeat(1.0).take(1000));
        let mut acc = Kbns::new();
        acc.extend(values.iter().copied());
        assert!((acc.sum() - 1001.0).abs() < 1e-6);
    }

    #[test]
    fn merge_of_partial_sums_matches_single_pass() {
        let values: Vec<f64> = (0..2000).map(|i| (i as f64).sin()).collect();
        let mut whole = Kbns::new();
        whole.extend(values.iter().copied());

        let mut a = Kbns::new();
        let mut b = Kbns::new();
        for (i, v) in values.iter().enumerate() {
            if i % 2 == 0 {
                a.add(*v);
            } else {
                b.add(*v);
            }
        }
        a.merge(b);
        assert!((a.sum() - whole.sum()).abs() < 1e-9);
    }

    #[test]
    fn shuffled_order_matches_canonical_order() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);
        let values: Vec<f64> = (0..200_000)
            .map(|i| ((i as f64) * 0.000_001).sin() * 1e6)
            .collect();

        let mut canonical = Kbns::new();
        canonical.extend(values.iter().copied());

        let mut shuffled = values.clone();
        shuffled.shuffle(&mut rng);
        let mut acc = Kbns::new();
        acc.extend(shuffled.iter().copied());

        assert_eq!(canonical.sum(), acc.sum());
    }

    proptest! {
        #[test]
        fn shuffled_permutations_are_order_independent(
            mut values in proptest::collection::vec(-1.0e6f64..1.0e6, 1..256)
        ) {
            let mut canonical = Kbns::new();
            canonical.extend(values.iter().copied());

            let mut rng = rand::rngs::StdRng::seed_from_u64(values.len() as u64);
            values.shuffle(&mut rng);
            let mut acc = Kbns::new();
            acc.extend(values.iter().copied());

            prop_assert_eq!(canonical.sum(), acc.sum());
        }
    }

    #[test]
    fn kbns4_tracks_four_independent_lanes() {
        let mut acc = Kbns4::new();
        acc.add([1.0, 10.0, 100.0, 1000.0]);
        acc.add([2.0, 20.0, 200.0, 2000.0]);
        assert_eq!(acc.sums(), [3.0, 30.0, 300.0, 3000.0]);
    }
}
