//! Virtual joystick output
//!
//! The [`OutputSink`] owns one slot of a virtual joystick driver and writes
//! the calibrated pedal values to it every cycle. Slots are tried in order
//! (primary, then alternates); when none can be acquired the sink switches to
//! simulated mode, where writes succeed without touching any hardware.

#![deny(unsafe_op_in_unsafe_fn)]
#![deny(clippy::unwrap_used)]

pub mod driver;
pub mod log_limit;
pub mod mock;
pub mod null;
pub mod sink;
#[cfg(all(target_os = "linux", feature = "uinput"))]
pub mod uinput;

pub use driver::{AxisUsage, SlotStatus, VirtualOutputDriver};
pub use log_limit::LogLimiter;
pub use null::NullDriver;
pub use sink::{OutputConfig, OutputSink, SinkState, SinkStats};
#[cfg(all(target_os = "linux", feature = "uinput"))]
pub use uinput::UinputDriver;

pub use openpedal_errors::OutputError;

pub type OutputResult<T> = Result<T, OutputError>;

/// Best available driver backend for this platform and feature set.
pub fn default_driver() -> Box<dyn VirtualOutputDriver> {
    #[cfg(all(target_os = "linux", feature = "uinput"))]
    {
        Box::new(UinputDriver::new())
    }
    #[cfg(not(all(target_os = "linux", feature = "uinput")))]
    {
        Box::new(NullDriver)
    }
}
