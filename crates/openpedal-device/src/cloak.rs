//! Hiding the physical device from other applications.
//!
//! While the pipeline owns the pedals, games should only see the virtual
//! controller. Platform hiding mechanisms plug in through [`DeviceCloak`].

use crate::DeviceResult;

pub trait DeviceCloak: Send {
    /// Hide the device with this identifier from other applications.
    fn hide(&mut self, identifier: &str) -> DeviceResult<()>;

    /// Make the device visible again.
    fn unhide(&mut self, identifier: &str) -> DeviceResult<()>;
}

/// Cloak that leaves the device visible.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCloak;

impl DeviceCloak for NoopCloak {
    fn hide(&mut self, _identifier: &str) -> DeviceResult<()> {
        Ok(())
    }

    fn unhide(&mut self, _identifier: &str) -> DeviceResult<()> {
        Ok(())
    }
}
