//! Level descriptors and the provider payload boundary.
//!
//! RULE: a `Level` can only be built through `Level::new`, so every value of
//! the type satisfies the invariants:
//!   - grid_size >= 1
//!   - start, goal and every obstacle lie inside the grid
//!   - start != goal
//!   - neither start nor goal is an obstacle
//! Levels are never mutated after construction; the engine swaps whole levels.

use crate::{error::LevelError, grid::Position};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub const FALLBACK_MESSAGE: &str = "Fallback level (level generation failed)";
pub const OFFLINE_MESSAGE: &str = "Level generator offline: playing an offline level.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "LevelRepr", into = "LevelRepr")]
pub struct Level {
    grid_size: u32,
    start:     Position,
    goal:      Position,
    obstacles: BTreeSet<Position>,
}

impl Level {
    pub fn new(
        grid_size: u32,
        start: Position,
        goal: Position,
        obstacles: impl IntoIterator<Item = Position>,
    ) -> Result<Self, LevelError> {
        if grid_size == 0 {
            return Err(LevelError::EmptyGrid);
        }
        let obstacles: BTreeSet<Position> = obstacles.into_iter().collect();

        check_bounds("start", start, grid_size)?;
        check_bounds("goal", goal, grid_size)?;
        for obstacle in &obstacles {
            check_bounds("obstacle", *obstacle, grid_size)?;
        }
        if start == goal {
            return Err(LevelError::StartIsGoal(start));
        }
        if obstacles.contains(&start) {
            return Err(LevelError::ObstacleOnStart(start));
        }
        if obstacles.contains(&goal) {
            return Err(LevelError::ObstacleOnGoal(goal));
        }

        Ok(Self { grid_size, start, goal, obstacles })
    }

    /// The hard-coded level substituted whenever the provider fails.
    pub fn fallback() -> Self {
        Self {
            grid_size: 4,
            start:     Position::new(0, 0),
            goal:      Position::new(3, 3),
            obstacles: BTreeSet::new(),
        }
    }

    pub fn grid_size(&self) -> u32 { self.grid_size }
    pub fn start(&self) -> Position { self.start }
    pub fn goal(&self) -> Position { self.goal }
    pub fn obstacles(&self) -> &BTreeSet<Position> { &self.obstacles }

    pub fn is_obstacle(&self, pos: Position) -> bool {
        self.obstacles.contains(&pos)
    }
}

fn check_bounds(role: &'static str, pos: Position, size: u32) -> Result<(), LevelError> {
    if pos.within(size) {
        Ok(())
    } else {
        Err(LevelError::OutOfBounds {
            role,
            x: pos.x as i64,
            y: pos.y as i64,
            size,
        })
    }
}

/// Plain serialized form of a `Level` (config files, snapshots).
/// Deserializing goes back through `Level::new`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct LevelRepr {
    grid_size: u32,
    start:     Position,
    goal:      Position,
    #[serde(default)]
    obstacles: Vec<Position>,
}

impl TryFrom<LevelRepr> for Level {
    type Error = LevelError;

    fn try_from(repr: LevelRepr) -> Result<Self, Self::Error> {
        Level::new(repr.grid_size, repr.start, repr.goal, repr.obstacles)
    }
}

impl From<Level> for LevelRepr {
    fn from(level: Level) -> Self {
        Self {
            grid_size: level.grid_size,
            start:     level.start,
            goal:      level.goal,
            obstacles: level.obstacles.into_iter().collect(),
        }
    }
}

/// Where the active level came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    Generated,
    Fallback,
}

// ── Provider payload boundary ──────────────────────────────────────

/// A coordinate as the provider sent it. Signed so negative values can be
/// reported rather than failing inside serde.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RawPosition {
    pub x: i64,
    pub y: i64,
}

/// The untrusted level shape returned by a level provider.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelPayload {
    pub grid_size: i64,
    #[serde(alias = "start")]
    pub robot_pos: RawPosition,
    #[serde(alias = "goal")]
    pub goal_pos:  RawPosition,
    /// Missing and `null` both mean no obstacles.
    #[serde(default)]
    pub obstacles: Option<Vec<RawPosition>>,
    #[serde(default)]
    pub message:   Option<String>,
}

impl LevelPayload {
    /// Parse provider text. Markdown code fences around the JSON are tolerated.
    pub fn parse(text: &str) -> Result<Self, LevelError> {
        let json = strip_code_fences(text);
        serde_json::from_str(json).map_err(|e| LevelError::Malformed(e.to_string()))
    }

    /// Validate against the level invariants and a maximum grid size.
    pub fn into_level(self, max_grid_size: u32) -> Result<(Level, Option<String>), LevelError> {
        if self.grid_size < 1 {
            return Err(LevelError::EmptyGrid);
        }
        if self.grid_size > max_grid_size as i64 {
            return Err(LevelError::GridTooLarge { size: self.grid_size, max: max_grid_size });
        }
        let size = self.grid_size as u32;

        let start = to_position("start", self.robot_pos, size)?;
        let goal = to_position("goal", self.goal_pos, size)?;
        let obstacles = self
            .obstacles
            .unwrap_or_default()
            .into_iter()
            .map(|raw| to_position("obstacle", raw, size))
            .collect::<Result<Vec<_>, _>>()?;

        let level = Level::new(size, start, goal, obstacles)?;
        let message = self.message.filter(|m| !m.trim().is_empty());
        Ok((level, message))
    }
}

fn to_position(role: &'static str, raw: RawPosition, size: u32) -> Result<Position, LevelError> {
    let inside = (0..size as i64).contains(&raw.x) && (0..size as i64).contains(&raw.y);
    if !inside {
        return Err(LevelError::OutOfBounds { role, x: raw.x, y: raw.y, size });
    }
    Ok(Position::new(raw.x as u32, raw.y as u32))
}

/// Remove a surrounding ```json ... ``` (or bare ```) fence, if present.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
