use std::time::Duration;

use engine::Tick;
use serde::{Deserialize, Serialize};

/// Playing time for the scoreboard. Accumulates only between `start` and
/// `stop`, so pauses and the game-over screen don't count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundTimer {
    #[serde(with = "crate::serde_duration")]
    elapsed: Duration,
    running_since: Option<Tick>,
}

impl RoundTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn is_running(&self) -> bool {
        self.running_since.is_some()
    }

    pub fn start(&mut self, now: Tick) {
        if self.running_since.is_none() {
            self.running_since = Some(now);
        }
    }

    pub fn stop(&mut self, now: Tick) {
        self.sync(now);
        self.running_since = None;
    }

    /// Folds the time since the last reading into `elapsed`. Called every tick
    /// so a single span never approaches a full counter wrap.
    pub fn sync(&mut self, now: Tick) {
        if let Some(since) = self.running_since {
            let us = now.elapsed_since(since);
            self.elapsed = self.elapsed.saturating_add(Duration::from_micros(u64::from(us)));
            self.running_since = Some(now);
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn whole_seconds(&self) -> u16 {
        self.elapsed.as_secs().min(u64::from(u16::MAX)) as u16
    }
}
