/// Milliseconds since boot.
///
/// Firmware reads the RP2040 timer; tests hand in whatever time they like.
pub trait Clock {
    fn now_ms(&mut self) -> u64;
}

pub const BUTTON_DEBOUNCE_DELAY: u32 = 500; // 500ms after a button press
pub const TICK_TIME_DELAY: u32 = 1000; // between loop iterations
pub const WARM_UP_DELAY: u32 = 500; // between discarded gas readings

/// Fires once `interval_ms` has passed since it was last marked.
///
/// Starts marked at boot (time zero), so the first fire happens one full
/// interval after power-on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct IntervalTimer {
    interval_ms: u64,
    last_ms: u64,
}

impl IntervalTimer {
    pub fn new(interval_ms: u64) -> IntervalTimer {
        Self {
            interval_ms,
            last_ms: 0,
        }
    }

    /// Whether the interval has elapsed at `now_ms`
    pub fn is_due(&self, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.last_ms) >= self.interval_ms
    }

    /// Restarts the interval from `now_ms`
    pub fn mark(&mut self, now_ms: u64) {
        self.last_ms = now_ms;
    }

    pub fn last_ms(&self) -> u64 {
        self.last_ms
    }

    /// Milliseconds left until the timer is due, zero if it already is
    pub fn remaining(&self, now_ms: u64) -> u64 {
        (self.last_ms + self.interval_ms).saturating_sub(now_ms)
    }
}
