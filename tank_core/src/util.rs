//! Small integer helpers for tank_core.

/// Divide with rounding to nearest, ties away from zero. `den` must be non-zero.
#[inline]
pub fn div_round_nearest(num: i64, den: i64) -> i64 {
    debug_assert!(den != 0);
    let q = num / den;
    let r = num % den;
    if 2 * r.abs() >= den.abs() {
        if (num < 0) == (den < 0) { q + 1 } else { q - 1 }
    } else {
        q
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(10, 2, 5)]
    #[case(15, 2, 8)]
    #[case(-15, 2, -8)]
    #[case(14, 3, 5)]
    #[case(13, 3, 4)]
    #[case(-14, 3, -5)]
    #[case(7, -2, -4)]
    #[case(0, 5, 0)]
    fn rounds_half_away_from_zero(#[case] num: i64, #[case] den: i64, #[case] want: i64) {
        assert_eq!(div_round_nearest(num, den), want);
    }
}
