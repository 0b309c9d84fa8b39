//! hidapi-backed pedal device.

use hidapi::{HidApi, HidDevice};
use tracing::{debug, info};

use crate::device::PedalDevice;
use crate::report::AxisReport;
use crate::DeviceResult;
use openpedal_errors::DeviceError;

const REPORT_BUFFER_LEN: usize = 64;

/// Reads drained per poll before giving up on reaching the newest report.
const MAX_REPORTS_PER_POLL: usize = 32;

/// Identity and report layout of the pedal device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HidDeviceConfig {
    pub vendor_id: u16,
    pub product_id: u16,
    pub identifier: String,
    /// Byte offset of the first axis field (1 when reports carry a report ID).
    pub report_axis_offset: usize,
    pub axis_count: usize,
}

/// One entry of the HID enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSummary {
    pub vendor_id: u16,
    pub product_id: u16,
    pub product: Option<String>,
    pub manufacturer: Option<String>,
}

/// Enumerate attached HID devices.
///
/// # Errors
///
/// Returns [`DeviceError::Hid`] if the HID subsystem cannot be initialized.
pub fn list_devices() -> DeviceResult<Vec<DeviceSummary>> {
    let api = HidApi::new().map_err(|e| DeviceError::Hid(e.to_string()))?;
    Ok(api
        .device_list()
        .map(|dev| DeviceSummary {
            vendor_id: dev.vendor_id(),
            product_id: dev.product_id(),
            product: dev.product_string().map(str::to_owned),
            manufacturer: dev.manufacturer_string().map(str::to_owned),
        })
        .collect())
}

/// Pedal box opened through hidapi in non-blocking mode.
pub struct HidPedalDevice {
    device: HidDevice,
    config: HidDeviceConfig,
    latest: Option<AxisReport>,
    buf: [u8; REPORT_BUFFER_LEN],
}

impl HidPedalDevice {
    /// Open the first device matching the configured VID/PID.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::Unavailable`] when no matching device can be opened.
    pub fn open(config: HidDeviceConfig) -> DeviceResult<Self> {
        let api = HidApi::new().map_err(|e| DeviceError::Hid(e.to_string()))?;
        let device = api.open(config.vendor_id, config.product_id).map_err(|e| {
            DeviceError::unavailable(format!(
                "{} (VID=0x{:04X} PID=0x{:04X}): {e}",
                config.identifier, config.vendor_id, config.product_id
            ))
        })?;
        device
            .set_blocking_mode(false)
            .map_err(|e| DeviceError::Hid(e.to_string()))?;

        info!(
            identifier = %config.identifier,
            vid = format_args!("0x{:04X}", config.vendor_id),
            pid = format_args!("0x{:04X}", config.product_id),
            "Opened HID pedal device"
        );

        Ok(Self {
            device,
            config,
            latest: None,
            buf: [0u8; REPORT_BUFFER_LEN],
        })
    }
}

impl PedalDevice for HidPedalDevice {
    fn name(&self) -> &str {
        &self.config.identifier
    }

    fn axis_count(&self) -> usize {
        self.config.axis_count
    }

    fn poll(&mut self) -> DeviceResult<()> {
        // Drain queued reports so the newest one wins.
        for _ in 0..MAX_REPORTS_PER_POLL {
            match self.device.read(&mut self.buf) {
                Ok(0) => break,
                Ok(n) => {
                    let Some(report) = self.buf.get(..n) else { break };
                    match AxisReport::parse(report, self.config.report_axis_offset, self.config.axis_count) {
                        Some(parsed) => self.latest = Some(parsed),
                        None => debug!(len = n, "Ignoring short input report"),
                    }
                }
                Err(e) => return Err(DeviceError::Disconnected(e.to_string())),
            }
        }
        Ok(())
    }

    fn read_axis(&mut self, axis: usize) -> DeviceResult<f32> {
        self.latest
            .as_ref()
            .and_then(|report| report.normalized(axis))
            .ok_or(DeviceError::TransientRead { axis })
    }
}
