//! Calibration model and the raw-to-output transform.

use std::sync::Arc;

use openpedal_errors::ValidationError;
use parking_lot::RwLock;

use crate::{AXIS_MAX, AxisMapping, AxisRange, AxisRanges, CalibrationCurve, Pedal, PedalSnapshot};

/// Range and curve for a single pedal.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PedalCalibration {
    pub range: AxisRange,
    pub curve: CalibrationCurve,
}

impl PedalCalibration {
    pub fn new(range: AxisRange, curve: CalibrationCurve) -> Self {
        Self { range, curve }
    }

    /// Transform a raw reading into an output value, both in `0..=65535`.
    ///
    /// Steps: normalize into percent of travel using the axis range, apply the
    /// low deadzone as a hard floor, saturate the high deadzone to 100%,
    /// stretch the remaining travel back over `0..100`, run the response curve,
    /// and scale back to 16 bits.
    pub fn apply(&self, raw: u16) -> u16 {
        let normalized = self.range.normalize(raw);
        let min_dz = f64::from(self.range.min_deadzone);
        let max_dz = f64::from(self.range.max_deadzone);

        if normalized < min_dz {
            return 0;
        }

        let scaled = if normalized > 100.0 - max_dz {
            100.0
        } else {
            let usable = 100.0 - min_dz - max_dz;
            if usable > 0.0 {
                ((normalized - min_dz) / usable * 100.0).clamp(0.0, 100.0)
            } else {
                normalized
            }
        };

        let output_pct = self.curve.interpolate(scaled).unwrap_or(scaled);
        pct_to_axis(output_pct)
    }
}

#[expect(clippy::cast_sign_loss, clippy::cast_possible_truncation, reason = "clamped to 0..=65535")]
fn pct_to_axis(pct: f64) -> u16 {
    let full = f64::from(AXIS_MAX);
    let value = (pct / 100.0 * full).round().clamp(0.0, full);
    // NaN saturates to 0
    value as u16
}

/// Complete calibration state: axis mapping plus range and curve per pedal.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CalibrationModel {
    pub mapping: AxisMapping,
    throttle: PedalCalibration,
    brake: PedalCalibration,
    clutch: PedalCalibration,
    handbrake: PedalCalibration,
}

impl CalibrationModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assemble a model from persisted parts. Invalid ranges are reset to the default.
    pub fn from_parts(
        mapping: AxisMapping,
        ranges: AxisRanges,
        mut curve_for: impl FnMut(Pedal) -> CalibrationCurve,
    ) -> Self {
        let mut model = Self {
            mapping,
            ..Self::default()
        };
        for pedal in Pedal::ALL {
            let mut curve = curve_for(pedal);
            curve.normalize();
            let slot = model.pedal_mut(pedal);
            slot.range = ranges.get(pedal).sanitized(pedal);
            slot.curve = curve;
        }
        model
    }

    pub fn pedal(&self, pedal: Pedal) -> &PedalCalibration {
        match pedal {
            Pedal::Throttle => &self.throttle,
            Pedal::Brake => &self.brake,
            Pedal::Clutch => &self.clutch,
            Pedal::Handbrake => &self.handbrake,
        }
    }

    fn pedal_mut(&mut self, pedal: Pedal) -> &mut PedalCalibration {
        match pedal {
            Pedal::Throttle => &mut self.throttle,
            Pedal::Brake => &mut self.brake,
            Pedal::Clutch => &mut self.clutch,
            Pedal::Handbrake => &mut self.handbrake,
        }
    }

    /// Calibrate one pedal. Pure: same model and input always give the same output.
    #[inline]
    pub fn apply(&self, pedal: Pedal, raw: u16) -> u16 {
        self.pedal(pedal).apply(raw)
    }

    /// Calibrate every pedal of a snapshot against this one model.
    pub fn apply_snapshot(&self, raw: &PedalSnapshot) -> PedalSnapshot {
        PedalSnapshot {
            throttle: self.throttle.apply(raw.throttle),
            brake: self.brake.apply(raw.brake),
            clutch: self.clutch.apply(raw.clutch),
            handbrake: self.handbrake.apply(raw.handbrake),
        }
    }

    pub fn range(&self, pedal: Pedal) -> &AxisRange {
        &self.pedal(pedal).range
    }

    pub fn curve(&self, pedal: Pedal) -> &CalibrationCurve {
        &self.pedal(pedal).curve
    }

    pub fn ranges(&self) -> AxisRanges {
        AxisRanges {
            throttle: self.throttle.range,
            brake: self.brake.range,
            clutch: self.clutch.range,
            handbrake: self.handbrake.range,
        }
    }

    /// Replace a pedal's curve; points are re-sorted and clamped.
    pub fn set_curve(&mut self, pedal: Pedal, mut curve: CalibrationCurve) {
        curve.normalize();
        self.pedal_mut(pedal).curve = curve;
    }

    /// Replace a pedal's range.
    ///
    /// An invalid range is not stored as given: the pedal falls back to the
    /// default full-scale range and the validation error is returned so the
    /// caller can report it.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidRange`] if `range` failed validation.
    pub fn set_range(&mut self, pedal: Pedal, range: AxisRange) -> Result<(), ValidationError> {
        let outcome = range.validate(pedal);
        self.pedal_mut(pedal).range = range.sanitized(pedal);
        outcome
    }
}

/// Calibration model shared between the input loop and the editor.
///
/// The loop takes the read lock once per cycle through [`SharedCalibration::read`];
/// editors mutate under the write lock through [`SharedCalibration::update`]
/// and never perform I/O while holding it.
#[derive(Debug, Clone, Default)]
pub struct SharedCalibration {
    inner: Arc<RwLock<CalibrationModel>>,
}

impl SharedCalibration {
    pub fn new(model: CalibrationModel) -> Self {
        Self {
            inner: Arc::new(RwLock::new(model)),
        }
    }

    /// Run `f` against a consistent view of the model.
    #[inline]
    pub fn read<R>(&self, f: impl FnOnce(&CalibrationModel) -> R) -> R {
        let guard = self.inner.read();
        f(&guard)
    }

    /// Mutate the model under the write lock and return a copy for persistence.
    pub fn update<R>(&self, f: impl FnOnce(&mut CalibrationModel) -> R) -> (R, CalibrationModel) {
        let mut guard = self.inner.write();
        let result = f(&mut guard);
        (result, guard.clone())
    }

    /// Copy of the current model.
    pub fn snapshot(&self) -> CalibrationModel {
        self.inner.read().clone()
    }

    pub fn replace(&self, model: CalibrationModel) {
        *self.inner.write() = model;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Raw reading that normalizes to `pct` on a full-scale range.
    fn raw_at(pct: f64) -> u16 {
        (pct / 100.0 * 65535.0).round() as u16
    }

    fn scenario() -> PedalCalibration {
        PedalCalibration::new(
            AxisRange::new(0, 65535).with_deadzones(10.0, 5.0),
            CalibrationCurve::from_pairs("Scenario", &[(0.0, 0.0), (50.0, 80.0), (100.0, 100.0)]),
        )
    }

    #[test]
    fn test_identity_without_curve() {
        let calibration = PedalCalibration::default();
        for raw in [0u16, 1, 1000, 32767, 32768, 65534, 65535] {
            assert_eq!(calibration.apply(raw), raw);
        }
    }

    #[test]
    fn test_scenario_low_deadzone_floor() {
        let calibration = scenario();
        assert_eq!(calibration.apply(raw_at(5.0)), 0);
        assert_eq!(calibration.apply(raw_at(9.99)), 0);
        // 6553 is the last raw value below 10%
        assert_eq!(calibration.apply(6553), 0);
        assert!(calibration.apply(6600) > 0);
    }

    #[test]
    fn test_scenario_mid_travel() {
        let calibration = scenario();
        let out = calibration.apply(raw_at(55.0));
        // (55 - 10) / 85 * 100 = 52.94%, between (50, 80) and (100, 100) -> 81.18%
        let pct = f64::from(out) / 65535.0 * 100.0;
        assert!((pct - 81.176).abs() < 0.05, "got {pct}");
    }

    #[test]
    fn test_scenario_high_deadzone_saturates() {
        let calibration = scenario();
        assert_eq!(calibration.apply(raw_at(96.0)), 65535);
        assert_eq!(calibration.apply(65535), 65535);
    }

    #[test]
    fn test_raw_outside_range_clamps() {
        let calibration = PedalCalibration::new(AxisRange::new(10_000, 50_000), CalibrationCurve::linear());
        assert_eq!(calibration.apply(0), 0);
        assert_eq!(calibration.apply(9_999), 0);
        assert_eq!(calibration.apply(50_000), 65535);
        assert_eq!(calibration.apply(60_000), 65535);
        assert_eq!(calibration.apply(30_000), 32768);
    }

    #[test]
    fn test_apply_snapshot_uses_each_pedal() {
        let mut model = CalibrationModel::new();
        model.set_curve(
            Pedal::Brake,
            CalibrationCurve::from_pairs("Half", &[(0.0, 0.0), (100.0, 50.0)]),
        );

        let out = model.apply_snapshot(&PedalSnapshot::new(65535, 65535, 65535, 0));
        assert_eq!(out.throttle, 65535);
        assert_eq!(out.brake, 32768);
        assert_eq!(out.clutch, 65535);
        assert_eq!(out.handbrake, 0);
    }

    #[test]
    fn test_set_range_falls_back_on_invalid() {
        let mut model = CalibrationModel::new();
        let err = model.set_range(Pedal::Clutch, AxisRange::new(100, 50));
        assert!(err.is_err());
        assert_eq!(*model.range(Pedal::Clutch), AxisRange::default());

        let ok = model.set_range(Pedal::Clutch, AxisRange::new(100, 5000));
        assert!(ok.is_ok());
        assert_eq!(model.range(Pedal::Clutch).max, 5000);
    }

    #[test]
    fn test_from_parts_sanitizes_ranges() {
        let ranges = AxisRanges {
            throttle: AxisRange::default().with_deadzones(70.0, 40.0),
            ..AxisRanges::default()
        };
        let model = CalibrationModel::from_parts(AxisMapping::default(), ranges, |pedal| {
            CalibrationCurve::from_pairs(pedal.as_str(), &[(100.0, 100.0), (0.0, 0.0)])
        });

        assert_eq!(*model.range(Pedal::Throttle), AxisRange::default());
        assert_eq!(model.curve(Pedal::Brake).label(), "brake");
        assert!((model.curve(Pedal::Brake).points()[0].input - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shared_update_returns_copy() {
        let shared = SharedCalibration::default();
        let ((), copy) = shared.update(|model| {
            model.set_curve(Pedal::Throttle, CalibrationCurve::from_pairs("Racing", &[(0.0, 0.0)]));
        });
        assert_eq!(copy.curve(Pedal::Throttle).label(), "Racing");
        assert_eq!(shared.read(|m| m.curve(Pedal::Throttle).label().to_string()), "Racing");
    }
}
