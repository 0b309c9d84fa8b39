//! Device Poller: owns the physical handle and produces one raw snapshot per cycle.

use openpedal_calibration::{AxisMapping, Pedal, PedalSnapshot};
use openpedal_errors::ValidationError;
use tracing::{debug, info, warn};

use crate::cloak::{DeviceCloak, NoopCloak};
use crate::device::{DeviceOpener, PedalDevice, axis_to_raw};

/// Connection state reported by [`DevicePoller::initialize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    Connected { axis_count: usize },
    Unavailable,
}

impl DeviceState {
    pub fn is_connected(&self) -> bool {
        matches!(self, DeviceState::Connected { .. })
    }
}

/// Receives a corrected axis mapping so it can be persisted.
///
/// The poller never touches the filesystem itself.
pub trait MappingSink: Send {
    fn mapping_changed(&mut self, mapping: &AxisMapping);
}

impl<F> MappingSink for F
where
    F: FnMut(&AxisMapping) + Send,
{
    fn mapping_changed(&mut self, mapping: &AxisMapping) {
        self(mapping)
    }
}

/// Separate device that supplies the handbrake axis.
struct HandbrakeInput {
    opener: Box<dyn DeviceOpener>,
    device: Option<Box<dyn PedalDevice>>,
    axis: usize,
}

impl HandbrakeInput {
    fn open(&mut self) {
        if self.device.is_some() {
            return;
        }
        let device = match self.opener.open() {
            Ok(device) => device,
            Err(e) => {
                warn!(error = %e, "Handbrake device unavailable, using fallback value");
                return;
            }
        };
        let axis_count = device.axis_count();
        if self.axis >= axis_count {
            warn!(
                device = %device.name(),
                axis = self.axis,
                axis_count,
                "Handbrake axis missing on device, marking handbrake unavailable"
            );
            return;
        }
        info!(device = %device.name(), axis_count, "Handbrake device connected");
        self.device = Some(device);
    }

    fn read(&mut self, transient_errors: &mut u64) -> HandbrakeRead {
        let Some(device) = self.device.as_mut() else {
            return HandbrakeRead::Skipped;
        };
        match device.poll() {
            Ok(()) => {}
            Err(e) if e.is_transient() => *transient_errors = transient_errors.saturating_add(1),
            Err(_) => return HandbrakeRead::Lost,
        }
        match device.read_axis(self.axis) {
            Ok(value) => match axis_to_raw(value) {
                Some(raw) => HandbrakeRead::Value(raw),
                None => {
                    *transient_errors = transient_errors.saturating_add(1);
                    HandbrakeRead::Skipped
                }
            },
            Err(e) if e.is_transient() => {
                *transient_errors = transient_errors.saturating_add(1);
                HandbrakeRead::Skipped
            }
            Err(_) => HandbrakeRead::Lost,
        }
    }
}

enum HandbrakeRead {
    Value(u16),
    /// Nothing usable this cycle; the previous value stays.
    Skipped,
    Lost,
}

/// Polls the pedal device and maps its axes onto pedals.
///
/// The handbrake either shares the pedal device, through the mapping, or
/// comes from its own device (see [`DevicePoller::with_handbrake`]).
///
/// `read` is the only method used from the input loop. It never blocks,
/// never logs and never fails.
pub struct DevicePoller {
    opener: Box<dyn DeviceOpener>,
    device: Option<Box<dyn PedalDevice>>,
    cloak: Box<dyn DeviceCloak>,
    /// Identifier currently hidden through the cloak.
    hidden: Option<String>,
    mapping: AxisMapping,
    mapping_sink: Option<Box<dyn MappingSink>>,
    state: DeviceState,
    /// Axis count of the last connected device.
    known_axis_count: Option<usize>,
    last: PedalSnapshot,
    handbrake: Option<HandbrakeInput>,
    transient_errors: u64,
    disconnects: u64,
}

impl DevicePoller {
    pub fn new(opener: impl DeviceOpener + 'static, mapping: AxisMapping) -> Self {
        Self {
            opener: Box::new(opener),
            device: None,
            cloak: Box::new(NoopCloak),
            hidden: None,
            mapping,
            mapping_sink: None,
            state: DeviceState::Unavailable,
            known_axis_count: None,
            last: PedalSnapshot::ZERO,
            handbrake: None,
            transient_errors: 0,
            disconnects: 0,
        }
    }

    pub fn with_cloak(mut self, cloak: impl DeviceCloak + 'static) -> Self {
        self.cloak = Box::new(cloak);
        self
    }

    pub fn with_mapping_sink(mut self, sink: impl MappingSink + 'static) -> Self {
        self.mapping_sink = Some(Box::new(sink));
        self
    }

    /// Read the handbrake from `axis` of a second device.
    ///
    /// The mapping's handbrake entry is then ignored. When this device cannot
    /// be opened the handbrake stays unavailable and keeps its last value.
    pub fn with_handbrake(mut self, opener: impl DeviceOpener + 'static, axis: usize) -> Self {
        self.handbrake = Some(HandbrakeInput {
            opener: Box::new(opener),
            device: None,
            axis,
        });
        self
    }

    /// Open the device and validate the axis mapping against it.
    ///
    /// Mapped axes the device does not have are forced to unavailable and the
    /// corrected mapping is handed to the [`MappingSink`]. A device that
    /// cannot be opened leaves the poller `Unavailable`; reads then return
    /// the last known values. A separate handbrake device is opened as well;
    /// its failure never affects the returned state.
    pub fn initialize(&mut self) -> DeviceState {
        if let Some(handbrake) = self.handbrake.as_mut() {
            handbrake.open();
        }
        if self.device.is_some() {
            return self.state;
        }

        let device = match self.opener.open() {
            Ok(device) => device,
            Err(e) => {
                warn!(error = %e, "Pedal device unavailable, using fallback values");
                self.state = DeviceState::Unavailable;
                return self.state;
            }
        };

        let axis_count = device.axis_count();
        let changed = self.mapping.validate(axis_count);
        if !changed.is_empty() {
            warn!(
                axis_count,
                pedals = ?changed,
                "Mapped axes missing on device, marking pedals unavailable"
            );
            if let Some(sink) = self.mapping_sink.as_mut() {
                sink.mapping_changed(&self.mapping);
            }
        }

        match self.cloak.hide(device.name()) {
            Ok(()) => self.hidden = Some(device.name().to_owned()),
            Err(e) => warn!(device = %device.name(), error = %e, "Failed to hide pedal device"),
        }

        info!(device = %device.name(), axis_count, "Pedal device connected");
        self.device = Some(device);
        self.known_axis_count = Some(axis_count);
        self.state = DeviceState::Connected { axis_count };
        self.state
    }

    /// Read the current raw values for every pedal.
    ///
    /// A failed axis keeps its previous value. Unmapped pedals and a missing
    /// device yield the last known values (zeros before the first read).
    pub fn read(&mut self) -> PedalSnapshot {
        self.read_handbrake();
        let separate_handbrake = self.handbrake.is_some();
        let Some(device) = self.device.as_mut() else {
            return self.last;
        };

        let mut lost = false;
        match device.poll() {
            Ok(()) => {}
            Err(e) if e.is_transient() => {
                self.transient_errors = self.transient_errors.saturating_add(1);
            }
            Err(_) => lost = true,
        }

        if !lost {
            for pedal in Pedal::ALL {
                if separate_handbrake && pedal == Pedal::Handbrake {
                    continue;
                }
                let Some(axis) = self.mapping.axis(pedal) else {
                    continue;
                };
                match device.read_axis(axis) {
                    Ok(value) => match axis_to_raw(value) {
                        Some(raw) => self.last[pedal] = raw,
                        None => self.transient_errors = self.transient_errors.saturating_add(1),
                    },
                    Err(e) if e.is_transient() => {
                        self.transient_errors = self.transient_errors.saturating_add(1);
                    }
                    Err(_) => {
                        lost = true;
                        break;
                    }
                }
            }
        }

        if lost {
            // Handle is dropped here; re-acquiring is an explicit action.
            self.device = None;
            self.state = DeviceState::Unavailable;
            self.disconnects = self.disconnects.saturating_add(1);
        }
        self.last
    }

    fn read_handbrake(&mut self) {
        let Some(handbrake) = self.handbrake.as_mut() else {
            return;
        };
        match handbrake.read(&mut self.transient_errors) {
            HandbrakeRead::Value(raw) => self.last[Pedal::Handbrake] = raw,
            HandbrakeRead::Skipped => {}
            HandbrakeRead::Lost => {
                handbrake.device = None;
                self.disconnects = self.disconnects.saturating_add(1);
            }
        }
    }

    pub fn state(&self) -> DeviceState {
        self.state
    }

    /// State of the separate handbrake device; `None` when none is configured.
    pub fn handbrake_state(&self) -> Option<DeviceState> {
        self.handbrake.as_ref().map(|handbrake| match handbrake.device.as_ref() {
            Some(device) => DeviceState::Connected {
                axis_count: device.axis_count(),
            },
            None => DeviceState::Unavailable,
        })
    }

    pub fn mapping(&self) -> &AxisMapping {
        &self.mapping
    }

    /// Replace the whole mapping, validating it against the connected device.
    pub fn set_mapping(&mut self, mapping: AxisMapping) {
        self.mapping = mapping;
        if let Some(axis_count) = self.known_axis_count
            && !self.mapping.validate(axis_count).is_empty()
            && let Some(sink) = self.mapping_sink.as_mut()
        {
            sink.mapping_changed(&self.mapping);
        }
    }

    /// Point one pedal at a new axis and persist the result.
    ///
    /// While no device has been seen yet any non-negative axis is accepted;
    /// it is checked on the next [`DevicePoller::initialize`].
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidMapping`] when the device has no such axis.
    pub fn update_mapping(&mut self, pedal: Pedal, axis: i32) -> Result<(), ValidationError> {
        let axis_count = self.known_axis_count.unwrap_or(usize::MAX);
        self.mapping.update(pedal, axis, axis_count)?;
        if let Some(sink) = self.mapping_sink.as_mut() {
            sink.mapping_changed(&self.mapping);
        }
        Ok(())
    }

    /// Drop the device handles and make the pedal device visible again.
    pub fn release(&mut self) {
        if let Some(device) = self.device.take() {
            info!(device = %device.name(), "Pedal device released");
        }
        if let Some(device) = self.handbrake.as_mut().and_then(|handbrake| handbrake.device.take()) {
            info!(device = %device.name(), "Handbrake device released");
        }
        if let Some(identifier) = self.hidden.take()
            && let Err(e) = self.cloak.unhide(&identifier)
        {
            warn!(device = %identifier, error = %e, "Failed to unhide pedal device");
        }
        self.state = DeviceState::Unavailable;
    }

    /// Release the current handles, if any, and open the devices again.
    pub fn reacquire(&mut self) -> DeviceState {
        debug!("Re-acquiring pedal device");
        self.release();
        self.initialize()
    }

    /// Last values returned by [`DevicePoller::read`].
    pub fn last_snapshot(&self) -> PedalSnapshot {
        self.last
    }

    pub fn transient_errors(&self) -> u64 {
        self.transient_errors
    }

    /// Times a device was lost during a read.
    pub fn disconnects(&self) -> u64 {
        self.disconnects
    }
}

impl Drop for DevicePoller {
    fn drop(&mut self) {
        self.release();
    }
}
