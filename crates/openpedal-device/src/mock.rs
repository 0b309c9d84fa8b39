//! Scriptable in-memory device for tests and simulation.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::device::PedalDevice;
use crate::DeviceResult;
use openpedal_errors::DeviceError;

#[derive(Debug)]
struct MockState {
    axes: Vec<f32>,
    failing: Vec<bool>,
    disconnected: bool,
    polls: u64,
}

/// Handle used to drive a [`MockPedalDevice`] after it has been boxed.
#[derive(Debug, Clone)]
pub struct MockHandle {
    identifier: String,
    axis_count: usize,
    state: Arc<Mutex<MockState>>,
}

impl MockHandle {
    /// Another device sharing this handle's state, as if the same pedals were re-opened.
    pub fn reopen(&self) -> MockPedalDevice {
        MockPedalDevice {
            identifier: self.identifier.clone(),
            axis_count: self.axis_count,
            state: Arc::clone(&self.state),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Set a normalized axis value.
    pub fn set_axis(&self, axis: usize, value: f32) {
        if let Some(slot) = self.lock().axes.get_mut(axis) {
            *slot = value;
        }
    }

    /// Make reads of `axis` fail until cleared.
    pub fn set_failing(&self, axis: usize, failing: bool) {
        if let Some(slot) = self.lock().failing.get_mut(axis) {
            *slot = failing;
        }
    }

    pub fn set_disconnected(&self, disconnected: bool) {
        self.lock().disconnected = disconnected;
    }

    pub fn polls(&self) -> u64 {
        self.lock().polls
    }
}

/// Device whose axes are set through a [`MockHandle`].
#[derive(Debug)]
pub struct MockPedalDevice {
    identifier: String,
    axis_count: usize,
    state: Arc<Mutex<MockState>>,
}

impl MockPedalDevice {
    /// New device with every axis at rest (-1.0).
    pub fn new(identifier: impl Into<String>, axis_count: usize) -> (Self, MockHandle) {
        let state = Arc::new(Mutex::new(MockState {
            axes: vec![-1.0; axis_count],
            failing: vec![false; axis_count],
            disconnected: false,
            polls: 0,
        }));
        let identifier = identifier.into();
        let device = Self {
            identifier: identifier.clone(),
            axis_count,
            state: Arc::clone(&state),
        };
        (device, MockHandle { identifier, axis_count, state })
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl PedalDevice for MockPedalDevice {
    fn name(&self) -> &str {
        &self.identifier
    }

    fn axis_count(&self) -> usize {
        self.axis_count
    }

    fn poll(&mut self) -> DeviceResult<()> {
        let mut state = self.lock();
        state.polls = state.polls.saturating_add(1);
        if state.disconnected {
            return Err(DeviceError::Disconnected(self.identifier.clone()));
        }
        Ok(())
    }

    fn read_axis(&mut self, axis: usize) -> DeviceResult<f32> {
        let state = self.lock();
        if state.failing.get(axis).copied().unwrap_or(true) {
            return Err(DeviceError::TransientRead { axis });
        }
        state.axes.get(axis).copied().ok_or(DeviceError::TransientRead { axis })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_drives_device() -> Result<(), Box<dyn std::error::Error>> {
        let (mut device, handle) = MockPedalDevice::new("mock", 2);
        handle.set_axis(1, 0.25);
        device.poll()?;
        assert_eq!(device.read_axis(1)?, 0.25);
        assert_eq!(device.read_axis(0)?, -1.0);
        assert_eq!(handle.polls(), 1);
        Ok(())
    }

    #[test]
    fn test_out_of_range_axis_fails() {
        let (mut device, _handle) = MockPedalDevice::new("mock", 1);
        assert!(matches!(device.read_axis(4), Err(DeviceError::TransientRead { axis: 4 })));
    }

    #[test]
    fn test_disconnect() {
        let (mut device, handle) = MockPedalDevice::new("mock", 1);
        handle.set_disconnected(true);
        assert!(matches!(device.poll(), Err(DeviceError::Disconnected(_))));
    }
}
