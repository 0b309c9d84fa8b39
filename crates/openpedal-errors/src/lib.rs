//! Centralized error types for OpenPedal
//!
//! Every failure in the pedal pipeline falls into one of a small number of
//! categories. Most of them are absorbed close to where they happen and turn
//! into a degraded-but-running state; only configuration-level problems are
//! surfaced to the operator.
//!
//! # Architecture
//!
//! - [`common`]: the top-level [`PedalError`] and [`ErrorSeverity`]
//! - [`device`]: physical pedal device errors
//! - [`output`]: virtual output driver errors
//! - [`storage`]: curve and calibration persistence errors
//! - [`validation`]: calibration model validation errors
//!
//! # Example
//!
//! ```
//! use openpedal_errors::prelude::*;
//!
//! fn check_deadzones(min_dz: f32, max_dz: f32) -> Result<()> {
//!     if min_dz + max_dz >= 100.0 {
//!         return Err(ValidationError::invalid_range("throttle", "deadzones sum to 100% or more").into());
//!     }
//!     Ok(())
//! }
//!
//! assert!(check_deadzones(10.0, 5.0).is_ok());
//! assert!(check_deadzones(60.0, 40.0).is_err());
//! ```

#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod common;
pub mod device;
pub mod output;
pub mod prelude;
pub mod storage;
pub mod validation;

pub use common::{ErrorSeverity, PedalError};
pub use device::DeviceError;
pub use output::OutputError;
pub use storage::StorageError;
pub use validation::ValidationError;

/// A specialized `Result` type for OpenPedal operations.
pub type Result<T> = std::result::Result<T, PedalError>;
