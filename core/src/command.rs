use crate::{clock::PlaybackSpeed, grid::Direction, types::StepIndex};
use serde::{Deserialize, Serialize};

/// All requests a UI shell can make of a puzzle session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum PlayerCommand {
    // ── Queue editing ─────────────────────────────
    AddCommand { command: Direction },
    RemoveCommand { index: StepIndex },
    Clear,

    // ── Run control ───────────────────────────────
    Run,
    Replay,
    Stop,
    SetSpeed { speed: PlaybackSpeed },

    // ── Progression ───────────────────────────────
    ChangeLevel { delta: i64 },
}
