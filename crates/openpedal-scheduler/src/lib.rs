//! Fixed-rate scheduling for the pedal input loop.
//!
//! The input loop polls the pedal device, calibrates, and writes the virtual
//! joystick once per period (1 ms by default). This crate provides:
//!
//! - **AbsoluteScheduler**: absolute wake times with a platform sleep and a busy-spin tail
//! - **RTSetup**: thread priority and memory locking for the loop thread
//! - **ProcessPriority**: raises the whole process to a high (not realtime) class
//!
//! # Example
//!
//! ```no_run
//! use openpedal_scheduler::{AbsoluteScheduler, RTSetup};
//!
//! let mut scheduler = AbsoluteScheduler::with_rate_hz(1000);
//! if let Err(e) = scheduler.apply_rt_setup(&RTSetup::default()) {
//!     eprintln!("running without elevated priority: {e}");
//! }
//!
//! for _ in 0..1000 {
//!     match scheduler.wait_for_tick() {
//!         Ok(_tick) => { /* poll, calibrate, write */ }
//!         Err(_) => { /* deadline missed, keep going */ }
//!     }
//! }
//! ```

#![deny(unsafe_op_in_unsafe_fn)]
#![deny(clippy::unwrap_used)]
#![deny(static_mut_refs)]
#![deny(unused_must_use)]

pub mod error;
pub mod process;
pub mod rt_setup;
pub mod scheduler;

#[cfg(target_os = "windows")]
mod windows;

#[cfg(target_os = "linux")]
mod linux;

#[cfg(not(any(target_os = "windows", target_os = "linux")))]
mod fallback;

pub use error::{RTError, RTResult};
pub use process::ProcessPriority;
pub use rt_setup::RTSetup;
pub use scheduler::{AbsoluteScheduler, TickStats};

/// Default loop period in nanoseconds (1 kHz)
pub const PERIOD_1KHZ_NS: u64 = 1_000_000;

/// Busy-spin window before each deadline in nanoseconds
pub const SPIN_TAIL_NS: u64 = 80_000;
