//! Collaborator seams for scores, run history, and persisted progress.
//!
//! Sinks are fire-and-forget from the engine's point of view: the session
//! logs their errors and carries on.

use crate::{
    store::{GameStore, RunRecord},
    types::LevelNumber,
};
use chrono::Utc;
use std::sync::{Arc, Mutex, MutexGuard};

pub trait ScoreSink: Send + Sync {
    fn record_score(&self, game_id: &str, score: u32) -> anyhow::Result<()>;

    /// Optional run history. Sinks that do not keep history ignore it.
    fn record_run(&self, _record: &RunRecord) -> anyhow::Result<()> {
        Ok(())
    }
}

pub trait ProgressStore: Send + Sync {
    fn load_current_level(&self, key: &str) -> anyhow::Result<Option<LevelNumber>>;
    fn save_current_level(&self, key: &str, level: LevelNumber) -> anyhow::Result<()>;
}

/// A `GameStore` shared between the session's sinks and its owner.
#[derive(Clone)]
pub struct SharedStore(Arc<Mutex<GameStore>>);

impl SharedStore {
    pub fn new(store: GameStore) -> Self {
        Self(Arc::new(Mutex::new(store)))
    }

    pub fn lock(&self) -> anyhow::Result<MutexGuard<'_, GameStore>> {
        self.0
            .lock()
            .map_err(|_| anyhow::anyhow!("game store lock poisoned"))
    }
}

impl ScoreSink for SharedStore {
    fn record_score(&self, game_id: &str, score: u32) -> anyhow::Result<()> {
        self.lock()?.record_score(game_id, score, Utc::now())?;
        Ok(())
    }

    fn record_run(&self, record: &RunRecord) -> anyhow::Result<()> {
        self.lock()?.append_run(record)?;
        Ok(())
    }
}

impl ProgressStore for SharedStore {
    fn load_current_level(&self, key: &str) -> anyhow::Result<Option<LevelNumber>> {
        Ok(self.lock()?.current_level(key)?)
    }

    fn save_current_level(&self, key: &str, level: LevelNumber) -> anyhow::Result<()> {
        self.lock()?.set_current_level(key, level)?;
        Ok(())
    }
}
