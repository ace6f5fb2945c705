use crate::timer::{Clock, Tick};
use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

/// Manually driven clock for deterministic runs.
///
/// Time only moves through [`SimClock::advance`] and [`Clock::sleep`].
/// Clones share the same counter.
#[derive(Debug, Clone, Default)]
pub struct SimClock {
    now: Rc<Cell<u32>>,
    calls: Rc<Cell<u64>>,
}

impl SimClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(ms: u32) -> Self {
        let clock = Self::default();
        clock.now.set(ms);
        clock
    }

    pub fn advance(&self, ms: u32) {
        self.now.set(self.now.get().wrapping_add(ms));
    }

    /// Current tick without counting as a clock call.
    pub fn peek(&self) -> Tick {
        Tick(self.now.get())
    }

    /// Number of `now`/`sleep` calls made through the [`Clock`] trait.
    pub fn calls(&self) -> u64 {
        self.calls.get()
    }
}

impl Clock for SimClock {
    fn now(&self) -> Tick {
        self.calls.set(self.calls.get() + 1);
        self.peek()
    }

    fn sleep(&self, d: Duration) {
        self.calls.set(self.calls.get() + 1);
        self.advance(d.as_millis().min(u32::MAX as u128) as u32);
    }
}
