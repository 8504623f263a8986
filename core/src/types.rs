//! Shared primitive types used across the entire engine.

/// A 1-based puzzle level number. Level 0 does not exist.
pub type LevelNumber = u32;

/// Index into the command queue.
pub type StepIndex = usize;

/// Stable identifier handed to the score sink (e.g. "sequencing").
pub type GameId = String;

/// The canonical identifier of one finished run in the run history.
pub type RunId = String;
