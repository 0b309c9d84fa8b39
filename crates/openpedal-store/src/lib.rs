//! Persistent pedal data
//!
//! Everything lives under one data directory (by default `~/.openpedal`):
//!
//! ```text
//! calibration.json       per-pedal curve in use
//! axis_ranges.json       per-pedal min/max and deadzones
//! axis_mappings.json     pedal -> device axis
//! curve_cache.json       persisted curve-list cache
//! curves/<pedal>/*.json  named curve presets
//! ```
//!
//! All writes are atomic (temporary file, then rename). None of this runs on
//! the input loop; edits reach it through the debounce coordinator.

#![deny(unsafe_op_in_unsafe_fn)]
#![deny(clippy::unwrap_used)]

pub mod cache;
pub mod calibration;
pub mod clock;
pub mod curves;
pub mod fs;
pub mod layout;
pub mod presets;
pub mod sync;

pub use cache::{CacheConfig, CacheLookup, CacheStats, CurveCache, CurveFileMeta};
pub use calibration::{CalibrationFiles, curves_of};
pub use clock::{Clock, ManualClock, SystemClock};
pub use curves::{CurveStore, validate_curve_name};
pub use layout::{DataLayout, default_data_dir};
pub use presets::{DefaultPreset, default_presets};
pub use sync::{CloudSync, NoopCloudSync, pull_missing_calibration, push_calibration};

pub use openpedal_errors::StorageError;
