use crate::driver::{AxisUsage, SlotStatus, VirtualOutputDriver};
use crate::OutputResult;
use openpedal_errors::OutputError;

/// Driver for platforms without a virtual joystick backend.
///
/// Every slot reports `Missing`, so the sink always runs simulated.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDriver;

impl VirtualOutputDriver for NullDriver {
    fn status(&mut self, _slot: u32) -> SlotStatus {
        SlotStatus::Missing
    }

    fn acquire(&mut self, slot: u32) -> OutputResult<()> {
        Err(OutputError::DriverMissing(slot))
    }

    fn relinquish(&mut self, _slot: u32) {}

    fn set_axis(&mut self, slot: u32, _usage: AxisUsage, _value: u16) -> OutputResult<()> {
        Err(OutputError::DriverMissing(slot))
    }
}
