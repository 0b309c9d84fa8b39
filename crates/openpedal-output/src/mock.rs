//! Scriptable driver for tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::driver::{AxisUsage, SlotStatus, VirtualOutputDriver};
use crate::OutputResult;
use openpedal_errors::OutputError;

#[derive(Debug, Default)]
struct MockDriverState {
    /// Scripted statuses per slot; the last entry repeats.
    statuses: HashMap<u32, VecDeque<SlotStatus>>,
    status_queries: Vec<u32>,
    owned: Vec<u32>,
    relinquished: Vec<u32>,
    writes: Vec<(u32, AxisUsage, u16)>,
    /// Channel count of each `set_axes` call
    batches: Vec<usize>,
    fail_writes: bool,
}

/// Driver whose slot statuses are scripted through a shared handle.
///
/// Slots without a script report `Missing`.
#[derive(Debug, Clone, Default)]
pub struct MockDriver {
    state: Arc<Mutex<MockDriverState>>,
}

impl MockDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_status(&self, slot: u32, status: SlotStatus) {
        self.set_status_sequence(slot, [status]);
    }

    /// Statuses returned by successive queries of `slot`; the last one sticks.
    pub fn set_status_sequence(&self, slot: u32, statuses: impl IntoIterator<Item = SlotStatus>) {
        self.state.lock().statuses.insert(slot, statuses.into_iter().collect());
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.state.lock().fail_writes = fail;
    }

    /// Slots in the order they were queried.
    pub fn status_queries(&self) -> Vec<u32> {
        self.state.lock().status_queries.clone()
    }

    pub fn owned(&self) -> Vec<u32> {
        self.state.lock().owned.clone()
    }

    pub fn relinquished(&self) -> Vec<u32> {
        self.state.lock().relinquished.clone()
    }

    pub fn writes(&self) -> Vec<(u32, AxisUsage, u16)> {
        self.state.lock().writes.clone()
    }

    /// Channels per batched write, in call order.
    pub fn batches(&self) -> Vec<usize> {
        self.state.lock().batches.clone()
    }

    pub fn clear_writes(&self) {
        let mut state = self.state.lock();
        state.writes.clear();
        state.batches.clear();
    }
}

impl VirtualOutputDriver for MockDriver {
    fn status(&mut self, slot: u32) -> SlotStatus {
        let mut state = self.state.lock();
        state.status_queries.push(slot);
        if state.owned.contains(&slot) {
            return SlotStatus::OwnedBySelf;
        }
        match state.statuses.get_mut(&slot) {
            Some(script) if script.len() > 1 => script.pop_front().unwrap_or(SlotStatus::Missing),
            Some(script) => script.front().copied().unwrap_or(SlotStatus::Missing),
            None => SlotStatus::Missing,
        }
    }

    fn acquire(&mut self, slot: u32) -> OutputResult<()> {
        let mut state = self.state.lock();
        let current = state.statuses.get(&slot).and_then(|s| s.front().copied());
        match current {
            Some(SlotStatus::Free) | Some(SlotStatus::OwnedBySelf) => {
                if !state.owned.contains(&slot) {
                    state.owned.push(slot);
                }
                Ok(())
            }
            Some(SlotStatus::Busy) => Err(OutputError::SlotBusy(slot)),
            Some(SlotStatus::Missing) | None => Err(OutputError::DriverMissing(slot)),
        }
    }

    fn relinquish(&mut self, slot: u32) {
        let mut state = self.state.lock();
        state.owned.retain(|owned| *owned != slot);
        state.relinquished.push(slot);
    }

    fn set_axis(&mut self, slot: u32, usage: AxisUsage, value: u16) -> OutputResult<()> {
        let mut state = self.state.lock();
        if state.fail_writes {
            return Err(OutputError::WriteFailed {
                slot,
                usage: usage.id(),
                reason: "scripted failure".to_string(),
            });
        }
        state.writes.push((slot, usage, value));
        Ok(())
    }

    fn set_axes(&mut self, slot: u32, values: &[(AxisUsage, u16)]) -> OutputResult<()> {
        let mut state = self.state.lock();
        if state.fail_writes {
            return Err(OutputError::WriteFailed {
                slot,
                usage: values.first().map_or(0, |&(usage, _)| usage.id()),
                reason: "scripted failure".to_string(),
            });
        }
        state.batches.push(values.len());
        state.writes.extend(values.iter().map(|&(usage, value)| (slot, usage, value)));
        Ok(())
    }
}
