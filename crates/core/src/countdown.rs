use std::time::Duration;

const SECOND: Duration = Duration::from_secs(1);

/// Converts measured elapsed time into whole-second ticks.
///
/// Timer callbacks are not guaranteed to fire exactly once a second: a
/// backgrounded host may coalesce several wakeups into one, and a busy one
/// may fire late. Feeding the real elapsed time here, instead of assuming one
/// second per callback, keeps the remaining time from drifting high. The
/// sub-second remainder carries over to the next call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Countdown {
    carry: Duration,
}

impl Countdown {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `elapsed` and returns how many whole seconds are now due.
    pub fn advance(&mut self, elapsed: Duration) -> u64 {
        let total = self.carry + elapsed;
        let whole = total.as_secs();
        self.carry = total - Duration::from_secs(whole);
        whole
    }

    /// Time accumulated toward the next tick.
    #[must_use]
    pub fn carry(&self) -> Duration {
        self.carry
    }

    /// Time left until the next whole second is due.
    #[must_use]
    pub fn until_next_tick(&self) -> Duration {
        SECOND - self.carry
    }

    pub fn reset(&mut self) {
        self.carry = Duration::ZERO;
    }
}
