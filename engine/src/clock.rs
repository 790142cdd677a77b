//! Wrapping tick arithmetic.
//!
//! Firmware reads a free-running 32-bit microsecond counter that rolls over
//! roughly every 71 minutes. Nothing in the core ever advances it; it only
//! compares a stored start value against the latest reading.

use serde::{Deserialize, Serialize};

/// One reading of the external microsecond counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tick(pub u32);

impl Tick {
    pub const ZERO: Tick = Tick(0);

    pub fn raw(self) -> u32 {
        self.0
    }

    pub fn wrapping_add(self, us: u32) -> Tick {
        Tick(self.0.wrapping_add(us))
    }

    /// Microseconds between `start` and `self`, treating the counter as wrapping.
    pub fn elapsed_since(self, start: Tick) -> u32 {
        self.0.wrapping_sub(start.0)
    }

    /// True once `delay` microseconds have passed since `start`.
    ///
    /// Valid for any delay shorter than one full counter period.
    pub fn expired(start: Tick, delay: u32, now: Tick) -> bool {
        now.elapsed_since(start) >= delay
    }
}

/// A start reading plus a declarative delay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timer {
    start: Tick,
    delay: u32,
}

impl Timer {
    pub fn new(start: Tick, delay: u32) -> Self {
        Self { start, delay }
    }

    pub fn start(&self) -> Tick {
        self.start
    }

    pub fn delay(&self) -> u32 {
        self.delay
    }

    pub fn restart(&mut self, now: Tick) {
        self.start = now;
    }

    /// Changes the delay without moving the start point.
    pub fn set_delay(&mut self, delay: u32) {
        self.delay = delay;
    }

    pub fn expired(&self, now: Tick) -> bool {
        Tick::expired(self.start, self.delay, now)
    }

    pub fn elapsed(&self, now: Tick) -> u32 {
        now.elapsed_since(self.start)
    }
}

/// Stand-in for the hardware counter when running headless.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickClock {
    now: Tick,
    period_us: u32,
}

impl TickClock {
    pub fn new(start: Tick, period_us: u32) -> Self {
        Self {
            now: start,
            period_us: period_us.max(1),
        }
    }

    pub fn now(&self) -> Tick {
        self.now
    }

    pub fn period_us(&self) -> u32 {
        self.period_us
    }

    pub fn advance(&mut self) -> Tick {
        self.now = self.now.wrapping_add(self.period_us);
        self.now
    }

    pub fn advance_by(&mut self, us: u32) -> Tick {
        self.now = self.now.wrapping_add(us);
        self.now
    }
}
