//! The player-authored command queue.
//!
//! The queue itself has no notion of a run; the engine is responsible for
//! refusing edits while a run is executing.

use crate::{grid::Direction, types::StepIndex};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommandQueue {
    commands: Vec<Direction>,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, cmd: Direction) {
        self.commands.push(cmd);
    }

    /// Remove the entry at `index`, shifting later entries down.
    /// Out-of-range indices return `None` and leave the queue untouched.
    pub fn remove(&mut self, index: StepIndex) -> Option<Direction> {
        (index < self.commands.len()).then(|| self.commands.remove(index))
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    pub fn get(&self, index: StepIndex) -> Option<Direction> {
        self.commands.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn as_slice(&self) -> &[Direction] {
        &self.commands
    }

    /// Compact letter form, e.g. "RRD". Used for run history.
    pub fn to_letters(&self) -> String {
        self.commands.iter().map(|c| c.letter()).collect()
    }
}

impl FromIterator<Direction> for CommandQueue {
    fn from_iter<I: IntoIterator<Item = Direction>>(iter: I) -> Self {
        Self { commands: iter.into_iter().collect() }
    }
}
