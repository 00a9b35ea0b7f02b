use proptest::prelude::*;
use tank_core::{Calibration, MovingAverage, percent};

fn reference_mean(window: &[i32]) -> i32 {
    let sum: i64 = window.iter().map(|&v| i64::from(v)).sum();
    (sum as f64 / window.len() as f64).round() as i32
}

prop_compose! {
    fn calibration()(full in 0i32..5000)(
        full in Just(full),
        empty in (full + 1)..=10_000,
    ) -> Calibration {
        Calibration::new(empty, full).unwrap()
    }
}

proptest! {
    #[test]
    fn filter_output_is_mean_of_last_window(
        window in 1usize..12,
        samples in prop::collection::vec(-100_000i32..100_000, 1..80),
    ) {
        let mut ma = MovingAverage::new(window);
        for (i, &s) in samples.iter().enumerate() {
            let got = ma.push(s);
            let lo = (i + 1).saturating_sub(window);
            prop_assert_eq!(got, reference_mean(&samples[lo..=i]));
        }
    }

    #[test]
    fn percent_stays_in_range(cal in calibration(), level in any::<i32>()) {
        prop_assert!(percent(level, &cal) <= 100);
    }

    #[test]
    fn percent_is_non_increasing_in_level(
        cal in calibration(),
        a in -20_000i32..20_000,
        b in -20_000i32..20_000,
    ) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(percent(lo, &cal) >= percent(hi, &cal));
    }

    #[test]
    fn calibration_marks_map_to_bounds(cal in calibration()) {
        prop_assert_eq!(percent(cal.full_level(), &cal), 100);
        prop_assert_eq!(percent(cal.empty_level(), &cal), 0);
    }
}
