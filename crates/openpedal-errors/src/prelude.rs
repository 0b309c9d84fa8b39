//! Convenience re-exports.

pub use crate::Result;
pub use crate::common::{ErrorSeverity, PedalError};
pub use crate::device::DeviceError;
pub use crate::output::OutputError;
pub use crate::storage::StorageError;
pub use crate::validation::ValidationError;
