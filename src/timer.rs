//! Relative-duration software timer.
//!
//! The core never reads a clock itself: every query takes the current
//! monotonic time in milliseconds, supplied once per control cycle.
//! A timer only reports expired while it is active; firing does not
//! deactivate it, only [`SoftTimer::cancel`] (or a restart) does.

/// Debounce / cooldown timer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SoftTimer {
    active: bool,
    start_ms: u64,
    duration_ms: u32,
}

impl SoftTimer {
    pub const fn new() -> Self {
        Self {
            active: false,
            start_ms: 0,
            duration_ms: 0,
        }
    }

    /// Arm (or re-arm) the timer from `now_ms`.
    pub fn start(&mut self, now_ms: u64, duration_ms: u32) {
        self.active = true;
        self.start_ms = now_ms;
        self.duration_ms = duration_ms;
    }

    pub fn cancel(&mut self) {
        self.active = false;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Active and at least `duration` has elapsed.
    pub fn is_expired(&self, now_ms: u64) -> bool {
        self.active && self.elapsed_ms(now_ms) >= u64::from(self.duration_ms)
    }

    /// Active and still counting down.
    pub fn is_running(&self, now_ms: u64) -> bool {
        self.active && !self.is_expired(now_ms)
    }

    /// Milliseconds since the timer was armed (0 if the clock went backwards).
    pub fn elapsed_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.start_ms)
    }
}
