//! Ghost projection: where the queue would leave the robot if no obstacle
//! stopped it. Pure; recomputed from scratch on every call.

use crate::{grid::{Direction, Position}, level::Level};

pub fn project(commands: &[Direction], level: &Level) -> Position {
    commands
        .iter()
        .fold(level.start(), |pos, cmd| cmd.apply(pos, level.grid_size()))
}
