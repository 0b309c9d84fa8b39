//! Pedal input daemon
//!
//! Wires the calibration store, the pedal device, the virtual joystick and
//! the debounced saves around the input engine, and exposes the `pedald`
//! command line.

#![deny(unsafe_op_in_unsafe_fn)]
#![deny(clippy::unwrap_used)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod logging;
pub mod service;

pub use cli::{Cli, Commands};
pub use config::ServiceConfig;
pub use service::{PedalService, RunOptions};
