//! Property-based tests for the calibration transform: identity, deadzones, monotonicity.

#[cfg(test)]
mod proptest_calibration {
    use openpedal_calibration::{AxisRange, CalibrationCurve, CalibrationModel, Pedal, PedalCalibration};
    use proptest::prelude::*;

    /// Monotonic curve from (0, 0) to (100, 100) through sorted interior points.
    fn monotonic_curve() -> impl Strategy<Value = CalibrationCurve> {
        prop::collection::vec((0.5f64..99.5, 0.0f64..=100.0), 0..6).prop_map(|pairs| {
            let mut inputs: Vec<f64> = pairs.iter().map(|p| p.0).collect();
            let mut outputs: Vec<f64> = pairs.iter().map(|p| p.1).collect();
            inputs.sort_by(f64::total_cmp);
            outputs.sort_by(f64::total_cmp);
            let mut points = vec![(0.0, 0.0)];
            points.extend(inputs.into_iter().zip(outputs));
            points.push((100.0, 100.0));
            CalibrationCurve::from_pairs("Generated", &points)
        })
    }

    fn valid_range() -> impl Strategy<Value = AxisRange> {
        (0i32..30_000, 1_000i32..35_535, 0.0f32..45.0, 0.0f32..45.0).prop_map(
            |(min, span, min_dz, max_dz)| AxisRange::new(min, min + span).with_deadzones(min_dz, max_dz),
        )
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(500))]

        // --- Identity: no curve, full range, no deadzones ---

        #[test]
        fn identity_without_curve(raw in 0u16..=u16::MAX) {
            let model = CalibrationModel::new();
            for pedal in Pedal::ALL {
                prop_assert_eq!(model.apply(pedal, raw), raw);
            }
        }

        // --- Low deadzone is a hard floor ---

        #[test]
        fn below_min_deadzone_is_zero(
            range in valid_range(),
            curve in monotonic_curve(),
            raw in 0u16..=u16::MAX,
        ) {
            let calibration = PedalCalibration::new(range, curve);
            if range.normalize(raw) < f64::from(range.min_deadzone) {
                prop_assert_eq!(calibration.apply(raw), 0);
            }
        }

        // --- High deadzone saturates ---

        #[test]
        fn above_max_deadzone_is_full_scale(
            range in valid_range(),
            curve in monotonic_curve(),
            raw in 0u16..=u16::MAX,
        ) {
            let calibration = PedalCalibration::new(range, curve);
            if range.normalize(raw) > 100.0 - f64::from(range.max_deadzone) {
                prop_assert_eq!(calibration.apply(raw), u16::MAX);
            }
        }

        // --- Monotonic for monotonic curves ---

        #[test]
        fn monotonic_in_raw(
            range in valid_range(),
            curve in monotonic_curve(),
            a in 0u16..=u16::MAX,
            b in 0u16..=u16::MAX,
        ) {
            let calibration = PedalCalibration::new(range, curve);
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(
                calibration.apply(lo) <= calibration.apply(hi),
                "apply({}) = {} > apply({}) = {}",
                lo, calibration.apply(lo), hi, calibration.apply(hi)
            );
        }

        // --- Deterministic ---

        #[test]
        fn apply_is_deterministic(
            range in valid_range(),
            curve in monotonic_curve(),
            raw in 0u16..=u16::MAX,
        ) {
            let calibration = PedalCalibration::new(range, curve);
            prop_assert_eq!(calibration.apply(raw), calibration.apply(raw));
        }

        // --- Identity through deadzone rescale is still monotonic and bounded ---

        #[test]
        fn no_curve_with_deadzones_stays_monotonic(
            range in valid_range(),
            raw in 0u16..u16::MAX,
        ) {
            let calibration = PedalCalibration::new(range, CalibrationCurve::linear());
            prop_assert!(calibration.apply(raw) <= calibration.apply(raw + 1));
        }

        // --- Curve interpolation never leaves the output range ---

        #[test]
        fn interpolation_bounded(
            pairs in prop::collection::vec((-50.0f64..150.0, -50.0f64..150.0), 1..8),
            input in 0.0f64..=100.0,
        ) {
            let curve = CalibrationCurve::from_pairs("Arbitrary", &pairs);
            let out = curve.interpolate(input).unwrap_or(-1.0);
            prop_assert!((0.0..=100.0).contains(&out), "out of range: {}", out);
        }
    }
}
