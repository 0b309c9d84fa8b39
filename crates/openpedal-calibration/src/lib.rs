//! Pedal calibration model
//!
//! This crate owns the calibration data for each pedal (axis mapping, axis
//! range with deadzones, and a piecewise-linear response curve) and the pure
//! transform that turns a raw device reading into an output value.
//!
//! The transform runs inside the 1 kHz input loop, so [`CalibrationModel::apply`]
//! performs no allocation, no locking, and no I/O. Sharing between the loop and
//! the editor goes through [`SharedCalibration`].

#![deny(unsafe_op_in_unsafe_fn)]
#![deny(clippy::unwrap_used)]

pub mod calibrator;
pub mod curve;
pub mod mapping;
pub mod model;
pub mod pedal;
pub mod range;

pub use calibrator::RangeCalibrator;
pub use curve::{CalibrationCurve, CurvePoint};
pub use mapping::AxisMapping;
pub use model::{CalibrationModel, PedalCalibration, SharedCalibration};
pub use pedal::{Pedal, PedalSnapshot, UnknownPedal};
pub use range::{AxisRange, AxisRanges};

use openpedal_errors::ValidationError;
use thiserror::Error;

/// Full-scale value of the canonical raw and output range.
pub const AXIS_MAX: u16 = u16::MAX;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalibrationError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Calibration not complete: {0}")]
    NotComplete(String),
}

pub type CalibrationResult<T> = Result<T, CalibrationError>;
