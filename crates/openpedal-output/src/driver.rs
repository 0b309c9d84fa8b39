//! Virtual joystick driver interface.

use openpedal_calibration::Pedal;

use crate::OutputResult;

/// Ownership status of one driver slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotStatus {
    /// Nobody owns the slot
    Free,
    /// This process already owns the slot
    OwnedBySelf,
    /// Another process owns the slot
    Busy,
    /// Driver not installed or slot not configured
    Missing,
}

/// HID usage IDs of the four pedal channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum AxisUsage {
    X = 0x30,
    Y = 0x31,
    Z = 0x32,
    Rx = 0x33,
}

impl AxisUsage {
    /// Channels in pedal order: throttle, brake, clutch, handbrake.
    pub const PEDAL_ORDER: [AxisUsage; 4] = [AxisUsage::X, AxisUsage::Y, AxisUsage::Z, AxisUsage::Rx];

    pub fn for_pedal(pedal: Pedal) -> Self {
        match pedal {
            Pedal::Throttle => AxisUsage::X,
            Pedal::Brake => AxisUsage::Y,
            Pedal::Clutch => AxisUsage::Z,
            Pedal::Handbrake => AxisUsage::Rx,
        }
    }

    pub fn id(self) -> u32 {
        self as u32
    }

    pub fn from_id(id: u32) -> Option<Self> {
        match id {
            0x30 => Some(AxisUsage::X),
            0x31 => Some(AxisUsage::Y),
            0x32 => Some(AxisUsage::Z),
            0x33 => Some(AxisUsage::Rx),
            _ => None,
        }
    }
}

/// A virtual joystick driver exposing numbered output slots.
///
/// `set_axis` and `set_axes` are called from the input loop and must not block.
pub trait VirtualOutputDriver: Send {
    fn status(&mut self, slot: u32) -> SlotStatus;

    /// Take ownership of a free slot.
    fn acquire(&mut self, slot: u32) -> OutputResult<()>;

    fn relinquish(&mut self, slot: u32);

    /// Write one channel, `value` in `0..=65535`.
    fn set_axis(&mut self, slot: u32, usage: AxisUsage, value: u16) -> OutputResult<()>;

    /// Write several channels as one update.
    ///
    /// Drivers that can publish a frame atomically should override this; the
    /// default writes the channels one by one and stops at the first error.
    fn set_axes(&mut self, slot: u32, values: &[(AxisUsage, u16)]) -> OutputResult<()> {
        for &(usage, value) in values {
            self.set_axis(slot, usage, value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_ids() {
        assert_eq!(AxisUsage::for_pedal(Pedal::Throttle).id(), 0x30);
        assert_eq!(AxisUsage::for_pedal(Pedal::Brake).id(), 0x31);
        assert_eq!(AxisUsage::for_pedal(Pedal::Clutch).id(), 0x32);
        assert_eq!(AxisUsage::for_pedal(Pedal::Handbrake).id(), 0x33);
        assert_eq!(AxisUsage::from_id(0x33), Some(AxisUsage::Rx));
        assert_eq!(AxisUsage::from_id(0x34), None);
    }

    #[test]
    fn test_pedal_order_matches_pedals() {
        for pedal in Pedal::ALL {
            assert_eq!(AxisUsage::PEDAL_ORDER.get(pedal.index()), Some(&AxisUsage::for_pedal(pedal)));
        }
    }
}
