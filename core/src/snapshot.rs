//! Read-only rendering view of the engine.
//!
//! A snapshot is a detached copy; holding one never blocks the engine.

use crate::{
    clock::PlaybackSpeed,
    grid::Position,
    level::{Level, Provenance},
    queue::CommandQueue,
    run::RunState,
    types::LevelNumber,
};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineSnapshot {
    pub level_number: LevelNumber,
    pub level:        Level,
    pub provenance:   Provenance,
    pub message:      Option<String>,
    pub queue:        CommandQueue,
    pub run:          RunState,
    pub ghost:        Position,
    pub is_loading:   bool,
    pub speed:        PlaybackSpeed,
}
