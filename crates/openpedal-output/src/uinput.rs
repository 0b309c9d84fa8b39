//! Linux uinput backend.
//!
//! Each slot is a separate uinput joystick named `OpenPedal Virtual Pedals #<slot>`
//! with ABS_X/Y/Z/RX axes in `0..=65535`.

use std::collections::HashMap;
use std::fs::OpenOptions;
use std::path::Path;

use evdev::uinput::{VirtualDevice, VirtualDeviceBuilder};
use evdev::{AbsInfo, AbsoluteAxisType, AttributeSet, EventType, InputEvent, Key, UinputAbsSetup};
use tracing::{debug, info};

use crate::driver::{AxisUsage, SlotStatus, VirtualOutputDriver};
use crate::OutputResult;
use openpedal_errors::OutputError;

const UINPUT_PATH: &str = "/dev/uinput";
const DEVICE_NAME_PREFIX: &str = "OpenPedal Virtual Pedals #";

fn slot_name(slot: u32) -> String {
    format!("{DEVICE_NAME_PREFIX}{slot}")
}

fn axis_type(usage: AxisUsage) -> AbsoluteAxisType {
    match usage {
        AxisUsage::X => AbsoluteAxisType::ABS_X,
        AxisUsage::Y => AbsoluteAxisType::ABS_Y,
        AxisUsage::Z => AbsoluteAxisType::ABS_Z,
        AxisUsage::Rx => AbsoluteAxisType::ABS_RX,
    }
}

/// Virtual joysticks created through `/dev/uinput`.
#[derive(Default)]
pub struct UinputDriver {
    devices: HashMap<u32, VirtualDevice>,
}

impl UinputDriver {
    pub fn new() -> Self {
        Self::default()
    }

    fn uinput_writable() -> bool {
        OpenOptions::new().write(true).open(Path::new(UINPUT_PATH)).is_ok()
    }

    /// Whether another process already exposes a joystick for this slot.
    fn claimed_elsewhere(slot: u32) -> bool {
        let name = slot_name(slot);
        evdev::enumerate().any(|(_, device)| device.name() == Some(name.as_str()))
    }

    fn build(slot: u32) -> std::io::Result<VirtualDevice> {
        let name = slot_name(slot);
        let mut keys = AttributeSet::<Key>::new();
        keys.insert(Key::BTN_TRIGGER);

        let mut builder = VirtualDeviceBuilder::new()?.name(&name).with_keys(&keys)?;
        for usage in AxisUsage::PEDAL_ORDER {
            let setup = UinputAbsSetup::new(axis_type(usage), AbsInfo::new(0, 0, i32::from(u16::MAX), 0, 0, 1));
            builder = builder.with_absolute_axis(&setup)?;
        }
        builder.build()
    }
}

impl VirtualOutputDriver for UinputDriver {
    fn status(&mut self, slot: u32) -> SlotStatus {
        if self.devices.contains_key(&slot) {
            return SlotStatus::OwnedBySelf;
        }
        if !Self::uinput_writable() {
            return SlotStatus::Missing;
        }
        if Self::claimed_elsewhere(slot) {
            SlotStatus::Busy
        } else {
            SlotStatus::Free
        }
    }

    fn acquire(&mut self, slot: u32) -> OutputResult<()> {
        if self.devices.contains_key(&slot) {
            return Ok(());
        }
        let device = Self::build(slot).map_err(|e| {
            debug!(slot, error = %e, "Failed to create uinput device");
            OutputError::DriverMissing(slot)
        })?;
        info!(slot, name = %slot_name(slot), "Created virtual joystick");
        self.devices.insert(slot, device);
        Ok(())
    }

    fn relinquish(&mut self, slot: u32) {
        if self.devices.remove(&slot).is_some() {
            info!(slot, "Destroyed virtual joystick");
        }
    }

    fn set_axis(&mut self, slot: u32, usage: AxisUsage, value: u16) -> OutputResult<()> {
        self.set_axes(slot, &[(usage, value)])
    }

    /// All channels go out in one `emit`, so readers see a single SYN_REPORT per frame.
    fn set_axes(&mut self, slot: u32, values: &[(AxisUsage, u16)]) -> OutputResult<()> {
        let device = self.devices.get_mut(&slot).ok_or(OutputError::DriverMissing(slot))?;
        if values.is_empty() {
            return Ok(());
        }
        let events: Vec<InputEvent> = values
            .iter()
            .map(|&(usage, value)| InputEvent::new(EventType::ABSOLUTE, axis_type(usage).0, i32::from(value)))
            .collect();
        device.emit(&events).map_err(|e| OutputError::WriteFailed {
            slot,
            usage: values.first().map_or(0, |&(usage, _)| usage.id()),
            reason: e.to_string(),
        })
    }
}
