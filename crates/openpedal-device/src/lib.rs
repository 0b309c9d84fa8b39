//! Physical pedal device access
//!
//! The [`DevicePoller`] owns the pedal device handle for the lifetime of the
//! input loop. Reading never blocks and never fails: a missing device yields
//! the last known values, and a glitch on one axis keeps that axis's previous
//! value while the other axes update normally.
//!
//! The concrete device sits behind the [`PedalDevice`] trait. The `hid`
//! feature provides a hidapi backend; [`mock`] provides a scriptable device
//! for tests.

#![deny(unsafe_op_in_unsafe_fn)]
#![deny(clippy::unwrap_used)]

pub mod cloak;
pub mod device;
#[cfg(feature = "hid")]
pub mod hid;
pub mod mock;
pub mod poller;
pub mod report;

pub use cloak::{DeviceCloak, NoopCloak};
pub use device::{DeviceOpener, PedalDevice, axis_to_raw};
#[cfg(feature = "hid")]
pub use hid::{DeviceSummary, HidDeviceConfig, HidPedalDevice, list_devices};
pub use poller::{DevicePoller, DeviceState, MappingSink};

pub use openpedal_errors::DeviceError;

pub type DeviceResult<T> = Result<T, DeviceError>;
