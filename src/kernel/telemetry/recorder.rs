use std::collections::VecDeque;

use super::event::TelemetryEvent;
use super::metrics::{compute_snapshot, status_trail, TelemetrySnapshot};
use crate::kernel::status::Status;

/// Events kept per session before the oldest are evicted.
pub const RECORDER_CAPACITY: usize = 10_000;

/// Session-scoped, content-free event history. Owned by the orchestrator, so it needs
/// no locking.
#[derive(Debug)]
pub struct TelemetryRecorder {
    history: VecDeque<TelemetryEvent>,
    capacity: usize,
    evicted: u64,
}

impl TelemetryRecorder {
    pub fn new() -> Self {
        Self::with_capacity(RECORDER_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            history: VecDeque::with_capacity(capacity.min(RECORDER_CAPACITY)),
            capacity,
            evicted: 0,
        }
    }

    pub fn record(&mut self, event: TelemetryEvent) {
        while self.history.len() >= self.capacity {
            self.history.pop_front();
            self.evicted += 1;
        }
        self.history.push_back(event);
    }

    /// Counters over the retained history. Evicted events no longer count.
    pub fn snapshot(&self) -> TelemetrySnapshot {
        compute_snapshot(&self.history)
    }

    pub fn status_trail(&self) -> Vec<Status> {
        status_trail(&self.history)
    }

    pub fn events(&self) -> impl Iterator<Item = &TelemetryEvent> {
        self.history.iter()
    }

    /// Events dropped off the front since the recorder was created.
    pub fn evicted(&self) -> u64 {
        self.evicted
    }
}

impl Default for TelemetryRecorder {
    fn default() -> Self {
        Self::new()
    }
}
