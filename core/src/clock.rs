//! Playback clock: owns run timing and playback speed.
//!
//! Only discrete-step timing is promised: a one-shot start delay, then one
//! tick per interval. Nothing here tracks frames.

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackClock {
    pub start_delay_ms:   u64,
    pub tick_interval_ms: u64,
    pub speed:            PlaybackSpeed,
}

impl PlaybackClock {
    pub fn new(start_delay_ms: u64, tick_interval_ms: u64) -> Self {
        Self {
            start_delay_ms,
            tick_interval_ms,
            speed: PlaybackSpeed::Normal,
        }
    }

    pub fn set_speed(&mut self, speed: PlaybackSpeed) {
        self.speed = speed;
    }

    /// Pause before the first tick, letting the reset animation settle.
    pub fn start_delay(&self) -> Duration {
        Duration::from_millis(self.start_delay_ms)
    }

    /// Time between ticks at the current speed. Never zero.
    pub fn tick_interval(&self) -> Duration {
        let ms = self.tick_interval_ms / self.speed.divisor();
        Duration::from_millis(ms.max(1))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackSpeed {
    #[default]
    Normal, // one command per tick_interval
    Fast,   // twice as fast
}

impl PlaybackSpeed {
    fn divisor(self) -> u64 {
        match self {
            Self::Normal => 1,
            Self::Fast   => 2,
        }
    }
}
