use std::time::Instant;

use chrono::Timelike;

/// Idle timer polling period.
pub const POLL_MS: u64 = 5_000;

/// A moment as the kernel sees it: monotonic milliseconds plus the local wall-clock hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Stamp {
    pub ms: u64,
    pub hour: u8,
}

impl Stamp {
    pub fn new(ms: u64, hour: u8) -> Self {
        Stamp { ms, hour }
    }

    pub fn later(&self, delta_ms: u64) -> Self {
        Stamp { ms: self.ms + delta_ms, hour: self.hour }
    }
}

pub trait Clock: Send {
    fn now(&self) -> Stamp;
}

/// Monotonic time since construction, local hour from the OS timezone.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        SystemClock { origin: Instant::now() }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Stamp {
        Stamp {
            ms: self.origin.elapsed().as_millis() as u64,
            hour: chrono::Local::now().hour() as u8,
        }
    }
}

/// Timestamp of the last meaningful activity. Never moves backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivityClock {
    last_ms: u64,
}

impl ActivityClock {
    pub fn starting_at(ms: u64) -> Self {
        ActivityClock { last_ms: ms }
    }

    pub fn touch(&mut self, ms: u64) {
        self.last_ms = self.last_ms.max(ms);
    }

    pub fn last(&self) -> u64 {
        self.last_ms
    }

    /// Milliseconds of quiescence as of `now_ms`.
    pub fn quiet_for(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.last_ms)
    }
}
