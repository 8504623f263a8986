//! Per-run state: robot position, cursor, outcome.

use crate::{grid::Position, types::StepIndex};
use serde::{Deserialize, Serialize, Serializer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    Idle,
    Running,
    Won,
    Failed,
}

impl RunOutcome {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Won | Self::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle    => "idle",
            Self::Running => "running",
            Self::Won     => "won",
            Self::Failed  => "failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// The robot stepped onto an obstacle.
    HitObstacle,
    /// The queue ran out away from the goal.
    MissedGoal,
}

impl FailureReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::HitObstacle => "hit_obstacle",
            Self::MissedGoal  => "missed_goal",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunState {
    pub robot_pos: Position,
    /// Index of the last executed command. `None` before the first tick;
    /// serialized as -1.
    #[serde(serialize_with = "cursor_as_signed")]
    pub cursor:    Option<StepIndex>,
    pub outcome:   RunOutcome,
    pub failure:   Option<FailureReason>,
}

impl RunState {
    pub fn idle_at(start: Position) -> Self {
        Self {
            robot_pos: start,
            cursor:    None,
            outcome:   RunOutcome::Idle,
            failure:   None,
        }
    }

    /// Number of commands executed so far.
    pub fn steps_taken(&self) -> usize {
        self.cursor.map_or(0, |c| c + 1)
    }

    pub fn is_running(&self) -> bool {
        self.outcome == RunOutcome::Running
    }
}

fn cursor_as_signed<S: Serializer>(cursor: &Option<StepIndex>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_i64(cursor.map_or(-1, |c| c as i64))
}
