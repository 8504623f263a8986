//! Engine events: every observable transition of the puzzle.
//!
//! RULE: the engine reports what happened only through these values.
//! Rejected input produces no event at all.

use crate::{
    grid::{Direction, Position},
    level::Provenance,
    run::FailureReason,
    types::{LevelNumber, StepIndex},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PathEvent {
    // ── Queue edits ────────────────────────────────
    CommandAdded {
        index:   StepIndex,
        command: Direction,
    },
    CommandRemoved {
        index:   StepIndex,
        command: Direction,
    },
    QueueCleared,

    // ── Run lifecycle ──────────────────────────────
    RunStarted {
        level: LevelNumber,
        epoch: u64,
        steps: usize,
    },
    RobotMoved {
        step:    StepIndex,
        command: Direction,
        from:    Position,
        to:      Position,
    },
    RunWon {
        level:    LevelNumber,
        steps:    usize,
        position: Position,
    },
    RunFailed {
        level:    LevelNumber,
        reason:   FailureReason,
        steps:    usize,
        position: Position,
    },
    RunReset {
        level: LevelNumber,
    },

    // ── Level loading ──────────────────────────────
    LevelLoading {
        level: LevelNumber,
    },
    LevelLoaded {
        level:      LevelNumber,
        provenance: Provenance,
        message:    Option<String>,
    },
    /// A load finished after a newer one was requested; its level was dropped.
    LevelLoadSuperseded {
        level: LevelNumber,
    },
}

impl PathEvent {
    /// Stable short name, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CommandAdded { .. }        => "command_added",
            Self::CommandRemoved { .. }      => "command_removed",
            Self::QueueCleared               => "queue_cleared",
            Self::RunStarted { .. }          => "run_started",
            Self::RobotMoved { .. }          => "robot_moved",
            Self::RunWon { .. }              => "run_won",
            Self::RunFailed { .. }           => "run_failed",
            Self::RunReset { .. }            => "run_reset",
            Self::LevelLoading { .. }        => "level_loading",
            Self::LevelLoaded { .. }         => "level_loaded",
            Self::LevelLoadSuperseded { .. } => "level_load_superseded",
        }
    }

    pub fn ends_run(&self) -> bool {
        matches!(self, Self::RunWon { .. } | Self::RunFailed { .. })
    }
}
