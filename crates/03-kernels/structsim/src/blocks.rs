/// Closed-form count of window positions of size `window` placed at
/// `stride` increments over `[0, length)`, i.e. the largest `k` such that
/// `(k-1)*stride + window <= length`.
pub fn num_blocks(length: usize, window: usize, stride: usize) -> usize {
    if length < window || stride == 0 {
        return 0;
    }
    (length - window) / stride + 1
}

/// Reference implementation of [`num_blocks`] by direct loop counting,
/// kept only to check the closed form against in tests.
pub fn num_blocks_loop_counted(length: usize, window: usize, stride: usize) -> usize {
    if stride == 0 {
        return 0;
    }
    let mut count = 0;
    let mut pos = 0;
    while pos + window <= length {
        count += 1;
        pos += stride;
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn matches_loop_counted_on_hand_picked_cases() {
        for (length, window, stride) in [
            (100usize, 8usize, 4usize),
            (101, 8, 4),
            (16, 16, 16),
            (15, 16, 1),
            (256, 16, 16),
            (7, 8, 4),
        ] {
            assert_eq!(
                num_blocks(length, window, stride),
                num_blocks_loop_counted(length, window, stride),
                "length={length} window={window} stride={stride}"
            );
        }
    }

    proptest! {
        #[test]
        fn closed_form_matches_loop_counted(
            length in 0usize..4096,
            window in 1usize..64,
            stride in 1usize..64,
        ) {
            prop_assume!(window >= stride);
            prop_assert_eq!(
                num_blocks(length, window, stride),
                num_blocks_loop_counted(length, window, stride)
            );
        }
    }
}
