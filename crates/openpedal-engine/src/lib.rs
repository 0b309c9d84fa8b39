//! Pedal input engine
//!
//! Owns the 1 kHz input loop. Once per period the loop reads the pedal
//! device, applies the calibration model, and writes the virtual joystick
//! when any value changed. A second, slower thread hands the latest frame to
//! an observer (the UI) and logs loop timing; the loop itself never logs on
//! its common path and never waits on that thread.
//!
//! ```text
//!   DevicePoller ──► CalibrationModel ──► OutputSink        (pedal-rt, 1 kHz)
//!                          │
//!                          └─► latest frame slot ──► observer (pedal-observer, ~60 Hz)
//! ```
//!
//! Editing the calibration goes through [`CalibrationEditor`], which mutates
//! the shared model and schedules the debounced saves.

#![deny(unsafe_op_in_unsafe_fn)]
#![deny(clippy::unwrap_used)]

pub mod config;
pub mod counters;
pub mod editor;
pub mod engine;
pub mod error;
pub mod monitor;
pub mod observer;
pub mod stats;

pub use config::EngineConfig;
pub use counters::{AtomicCounters, CounterSnapshot};
pub use editor::{CalibrationEditor, PersistQueue};
pub use engine::Engine;
pub use error::EngineError;
pub use monitor::RawMonitor;
pub use observer::{LatestFrame, ObservedFrame, SnapshotObserver};
pub use stats::FrameStats;

pub type EngineResult<T> = Result<T, EngineError>;
