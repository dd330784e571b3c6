use serde::{Deserialize, Serialize};

/// Quiet-hours gate.
///
/// `start == end` disables the window (always awake). `start < end` is the half-open
/// range `[start, end)`; `start > end` wraps past midnight.
pub fn is_quiet(hour: u8, start: u8, end: u8) -> bool {
    if start == end {
        return false;
    }
    if start < end {
        hour >= start && hour < end
    } else {
        hour >= start || hour < end
    }
}

/// Daily dormancy window, hours in `0..=23`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuietHours {
    pub start: u8,
    pub end: u8,
}

impl QuietHours {
    pub fn new(start: u8, end: u8) -> Self {
        QuietHours { start, end }
    }

    pub fn disabled() -> Self {
        QuietHours { start: 0, end: 0 }
    }

    pub fn is_valid(&self) -> bool {
        self.start <= 23 && self.end <= 23
    }

    pub fn contains(&self, hour: u8) -> bool {
        is_quiet(hour, self.start, self.end)
    }
}

impl Default for QuietHours {
    fn default() -> Self {
        QuietHours { start: 23, end: 7 }
    }
}
