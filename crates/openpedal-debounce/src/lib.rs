//! Debounced persistence for calibration edits
//!
//! Dragging a curve point or a deadzone slider produces a burst of edits.
//! Saving each one would hammer the disk (and the cloud), so saves go through
//! a [`DebounceCoordinator`]: every named action waits for its input to
//! settle for `delay`, but never longer than `max_delay` after the first
//! trigger of a burst. Only the last payload of a burst is saved.
//!
//! Timers run on the tokio runtime and use `tokio::time`, so tests can drive
//! them with a paused clock.

#![deny(unsafe_op_in_unsafe_fn)]
#![deny(clippy::unwrap_used)]

pub mod actions;
pub mod coordinator;
pub mod error;

pub use actions::ActionSpec;
pub use coordinator::{ActionStats, DebounceCoordinator};
pub use error::DebounceError;

pub type DebounceResult<T> = Result<T, DebounceError>;
