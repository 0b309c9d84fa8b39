//! Hand-off of the latest frame from the loop to a slow observer.

use crossbeam::queue::ArrayQueue;
use openpedal_calibration::PedalSnapshot;

/// One loop cycle as seen by the observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObservedFrame {
    pub cycle: u64,
    pub raw: PedalSnapshot,
    pub calibrated: PedalSnapshot,
}

/// Receives frames on the observer thread.
pub trait SnapshotObserver: Send {
    fn on_frame(&mut self, frame: &ObservedFrame);
}

impl<F> SnapshotObserver for F
where
    F: FnMut(&ObservedFrame) + Send,
{
    fn on_frame(&mut self, frame: &ObservedFrame) {
        self(frame)
    }
}

/// Single-slot queue: publishing overwrites whatever the observer has not taken yet.
#[derive(Debug)]
pub struct LatestFrame {
    slot: ArrayQueue<ObservedFrame>,
}

impl Default for LatestFrame {
    fn default() -> Self {
        Self::new()
    }
}

impl LatestFrame {
    pub fn new() -> Self {
        Self {
            slot: ArrayQueue::new(1),
        }
    }

    /// Never blocks and never fails.
    #[inline]
    pub fn publish(&self, frame: ObservedFrame) {
        let _stale = self.slot.force_push(frame);
    }

    pub fn take(&self) -> Option<ObservedFrame> {
        self.slot.pop()
    }

    pub fn len(&self) -> usize {
        self.slot.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slot.is_empty()
    }
}
