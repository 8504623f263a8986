use crate::grid::Position;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GameError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid level: {0}")]
    InvalidLevel(#[from] LevelError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// A violated level invariant. Raised at the provider boundary only;
/// the loader turns every one of these into a fallback level.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LevelError {
    #[error("grid size must be at least 1")]
    EmptyGrid,

    #[error("grid size {size} exceeds the maximum of {max}")]
    GridTooLarge { size: i64, max: u32 },

    #[error("{role} position ({x},{y}) lies outside a {size}x{size} grid")]
    OutOfBounds { role: &'static str, x: i64, y: i64, size: u32 },

    #[error("start and goal share the cell {0}")]
    StartIsGoal(Position),

    #[error("obstacle placed on the start cell {0}")]
    ObstacleOnStart(Position),

    #[error("obstacle placed on the goal cell {0}")]
    ObstacleOnGoal(Position),

    #[error("malformed level payload: {0}")]
    Malformed(String),
}

pub type GameResult<T> = Result<T, GameError>;
