//! Device abstraction consumed by the poller.

use openpedal_calibration::AXIS_MAX;

use crate::DeviceResult;

/// A physical input device exposing N analog axes.
///
/// `poll` and `read_axis` run inside the input loop and must not block.
pub trait PedalDevice: Send {
    /// Logical device identifier, also used for device cloaking.
    fn name(&self) -> &str;

    /// Number of analog axes.
    fn axis_count(&self) -> usize;

    /// Pull any pending input report from the device without waiting.
    fn poll(&mut self) -> DeviceResult<()>;

    /// Latest value of one axis, normalized to `[-1.0, 1.0]`.
    fn read_axis(&mut self, axis: usize) -> DeviceResult<f32>;
}

/// Opens the physical device. Called at startup and on explicit re-acquire only.
pub trait DeviceOpener: Send {
    fn open(&mut self) -> DeviceResult<Box<dyn PedalDevice>>;
}

impl<F> DeviceOpener for F
where
    F: FnMut() -> DeviceResult<Box<dyn PedalDevice>> + Send,
{
    fn open(&mut self) -> DeviceResult<Box<dyn PedalDevice>> {
        self()
    }
}

/// Convert a normalized axis reading in `[-1.0, 1.0]` to the canonical `0..=65535` range.
///
/// Returns `None` for NaN so the caller can keep the previous value.
#[inline]
#[expect(clippy::cast_sign_loss, clippy::cast_possible_truncation, reason = "clamped to 0..=65535")]
pub fn axis_to_raw(value: f32) -> Option<u16> {
    if value.is_nan() {
        return None;
    }
    let full = f32::from(AXIS_MAX);
    let scaled = ((value.clamp(-1.0, 1.0) + 1.0) * 0.5 * full).round();
    Some(scaled.clamp(0.0, full) as u16)
}
