//! Live calibration editing.
//!
//! Edits land in [`SharedCalibration`] immediately, so the input loop picks
//! them up on its next cycle; the matching save is only scheduled.

use std::sync::Arc;

use openpedal_calibration::{
    AxisRange, CalibrationCurve, CalibrationModel, CalibrationResult, Pedal, RangeCalibrator, SharedCalibration,
};
use openpedal_debounce::actions::{CLOUD_PUSH, REFRESH_CURVES, SAVE_AXIS_MAPPINGS, SAVE_AXIS_RANGES, SAVE_CALIBRATION};
use openpedal_debounce::{ActionSpec, DebounceCoordinator};
use openpedal_errors::ValidationError;
use tracing::{debug, info};

use crate::monitor::RawMonitor;

/// Debounced persistence of calibration snapshots.
pub type PersistQueue = DebounceCoordinator<CalibrationModel>;

/// Mutates the shared calibration and schedules the debounced saves.
#[derive(Clone)]
pub struct CalibrationEditor {
    shared: SharedCalibration,
    persist: Arc<PersistQueue>,
    monitor: RawMonitor,
    axis_count: usize,
}

impl CalibrationEditor {
    pub fn new(shared: SharedCalibration, persist: Arc<PersistQueue>, monitor: RawMonitor) -> Self {
        Self {
            shared,
            persist,
            monitor,
            axis_count: usize::MAX,
        }
    }

    /// Reject mappings past the last axis of the open device.
    ///
    /// Without it any non-negative axis is accepted here and the poller
    /// disables out-of-range mappings when it sees them.
    pub fn with_axis_count(mut self, axis_count: usize) -> Self {
        self.axis_count = axis_count;
        self
    }

    pub fn model(&self) -> CalibrationModel {
        self.shared.snapshot()
    }

    pub fn set_curve(&self, pedal: Pedal, curve: CalibrationCurve) {
        let ((), model) = self.shared.update(|model| model.set_curve(pedal, curve));
        debug!(%pedal, curve = model.curve(pedal).label(), "Curve updated");
        self.schedule(SAVE_CALIBRATION, &model);
        self.schedule(CLOUD_PUSH, &model);
    }

    /// Apply a named preset to `pedal`; the curve takes the preset's name.
    pub fn apply_preset(&self, pedal: Pedal, name: &str, mut curve: CalibrationCurve) {
        curve.set_label(name);
        info!(%pedal, preset = name, "Applying curve preset");
        self.set_curve(pedal, curve);
    }

    /// Replace a pedal's range. An invalid range leaves the model untouched.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidRange`] if `range` fails validation.
    pub fn set_range(&self, pedal: Pedal, range: AxisRange) -> Result<(), ValidationError> {
        range.validate(pedal)?;
        let (stored, model) = self.shared.update(|model| model.set_range(pedal, range));
        stored?;
        self.schedule(SAVE_AXIS_RANGES, &model);
        Ok(())
    }

    /// Adjust only the deadzones of a pedal's range.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidRange`] if the deadzones are negative
    /// or cover the whole travel.
    pub fn set_deadzones(&self, pedal: Pedal, min_deadzone: f32, max_deadzone: f32) -> Result<AxisRange, ValidationError> {
        let range = self
            .shared
            .read(|model| *model.range(pedal))
            .with_deadzones(min_deadzone, max_deadzone);
        self.set_range(pedal, range)?;
        Ok(range)
    }

    /// Use the pedal's current raw reading as its minimum.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidRange`] if the reading is not below the current maximum.
    pub fn set_current_as_min(&self, pedal: Pedal) -> Result<AxisRange, ValidationError> {
        let raw = self.monitor.load()[pedal];
        let range = AxisRange {
            min: i32::from(raw),
            ..self.shared.read(|model| *model.range(pedal))
        };
        self.set_range(pedal, range)?;
        info!(%pedal, min = raw, "Captured minimum from current position");
        Ok(range)
    }

    /// Use the pedal's current raw reading as its maximum.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidRange`] if the reading is not above the current minimum.
    pub fn set_current_as_max(&self, pedal: Pedal) -> Result<AxisRange, ValidationError> {
        let raw = self.monitor.load()[pedal];
        let range = AxisRange {
            max: i32::from(raw),
            ..self.shared.read(|model| *model.range(pedal))
        };
        self.set_range(pedal, range)?;
        info!(%pedal, max = raw, "Captured maximum from current position");
        Ok(range)
    }

    /// Feed the current raw reading of the calibrator's pedal into it.
    pub fn sample(&self, calibrator: &mut RangeCalibrator) {
        calibrator.sample(self.monitor.load()[calibrator.pedal()]);
    }

    /// Store the travel a [`RangeCalibrator`] captured, keeping the current deadzones.
    ///
    /// # Errors
    ///
    /// Returns [`openpedal_calibration::CalibrationError::NotComplete`] if too
    /// few distinct values were sampled, or a validation error.
    pub fn apply_captured_range(&self, calibrator: &RangeCalibrator) -> CalibrationResult<AxisRange> {
        let pedal = calibrator.pedal();
        let current = self.shared.read(|model| *model.range(pedal));
        let range = calibrator.finish(&current)?;
        self.set_range(pedal, range)?;
        info!(%pedal, min = range.min, max = range.max, samples = calibrator.samples(), "Range calibration applied");
        Ok(range)
    }

    /// Point `pedal` at `axis`, or at [`openpedal_calibration::AxisMapping::UNAVAILABLE`].
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidMapping`] for an axis the device does not have.
    pub fn set_mapping(&self, pedal: Pedal, axis: i32) -> Result<(), ValidationError> {
        let axis_count = self.axis_count;
        let (updated, model) = self
            .shared
            .update(|model| model.mapping.update(pedal, axis, axis_count));
        updated?;
        debug!(%pedal, axis, "Axis mapping updated");
        self.schedule(SAVE_AXIS_MAPPINGS, &model);
        Ok(())
    }

    /// Ask for the curve list to be rescanned once edits settle.
    pub fn refresh_curves(&self) {
        self.schedule(REFRESH_CURVES, &self.shared.snapshot());
    }

    fn schedule(&self, action: ActionSpec, model: &CalibrationModel) {
        if let Err(e) = self.persist.trigger(action.name, model.clone()) {
            debug!(action = action.name, error = %e, "Save not scheduled");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use openpedal_calibration::PedalSnapshot;
    use tokio::runtime::Handle;

    fn editor() -> (CalibrationEditor, RawMonitor) {
        let monitor = RawMonitor::new();
        let persist = Arc::new(PersistQueue::new(Handle::current()));
        let editor = CalibrationEditor::new(SharedCalibration::default(), persist, monitor.clone());
        (editor, monitor)
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_range_leaves_model_untouched() {
        let (editor, _) = editor();
        let before = *editor.model().range(Pedal::Brake);

        assert!(editor.set_range(Pedal::Brake, AxisRange::new(900, 100)).is_err());
        assert_eq!(*editor.model().range(Pedal::Brake), before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_current_position_capture() -> Result<(), Box<dyn std::error::Error>> {
        let (editor, monitor) = editor();

        monitor.store(&PedalSnapshot::new(0, 1_200, 0, 0));
        editor.set_current_as_min(Pedal::Brake)?;
        monitor.store(&PedalSnapshot::new(0, 60_000, 0, 0));
        let range = editor.set_current_as_max(Pedal::Brake)?;

        assert_eq!((range.min, range.max), (1_200, 60_000));
        assert_eq!(*editor.model().range(Pedal::Brake), range);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_mapping_respects_axis_count() {
        let (editor, _) = editor();
        let editor = editor.with_axis_count(3);

        assert!(editor.set_mapping(Pedal::Handbrake, 3).is_err());
        assert!(editor.set_mapping(Pedal::Handbrake, -1).is_ok());
        assert_eq!(editor.model().mapping.axis(Pedal::Handbrake), None);
    }
}
