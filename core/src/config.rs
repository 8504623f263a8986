//! Engine configuration, loaded from `{data_dir}/engine.json`.
//!
//! Every field has a default, so a partial file (or no file) is valid.

use crate::{
    clock::PlaybackClock,
    error::GameResult,
    level::{Level, FALLBACK_MESSAGE},
    types::{GameId, LevelNumber},
};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const CONFIG_FILE: &str = "engine.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Identifier handed to the score sink.
    pub game_id:          GameId,
    pub start_delay_ms:   u64,
    pub tick_interval_ms: u64,
    /// A win on level N scores `points_per_level * N`.
    pub points_per_level: u32,
    /// Provider payloads with a larger grid are rejected.
    pub max_grid_size:    u32,
    /// Storage key of the persisted current level.
    pub progress_key:     String,
    pub generator_seed:   u64,
    pub fallback_level:   Level,
    pub fallback_message: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            game_id:          "sequencing".to_string(),
            start_delay_ms:   500,
            tick_interval_ms: 600,
            points_per_level: 10,
            max_grid_size:    8,
            progress_key:     "robopath.current_level".to_string(),
            generator_seed:   0x5EED_0F_C0DE,
            fallback_level:   Level::fallback(),
            fallback_message: FALLBACK_MESSAGE.to_string(),
        }
    }
}

impl EngineConfig {
    /// Load `{data_dir}/engine.json`. A missing file yields the defaults;
    /// an unreadable or malformed one is an error.
    pub fn load(data_dir: impl AsRef<Path>) -> GameResult<Self> {
        let path = data_dir.as_ref().join(CONFIG_FILE);
        if !path.exists() {
            log::info!("{} not found; using default engine config", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path)?;
        let config: Self = serde_json::from_str(&content)?;
        log::debug!("loaded engine config from {}", path.display());
        Ok(config)
    }

    /// Defaults with short timing, for tests.
    pub fn default_test() -> Self {
        Self {
            start_delay_ms:   10,
            tick_interval_ms: 10,
            ..Self::default()
        }
    }

    pub fn playback_clock(&self) -> PlaybackClock {
        PlaybackClock::new(self.start_delay_ms, self.tick_interval_ms)
    }

    pub fn score_for_level(&self, level: LevelNumber) -> u32 {
        self.points_per_level.saturating_mul(level)
    }
}
