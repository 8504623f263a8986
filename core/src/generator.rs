//! Procedural level provider: a local stand-in for a remote level designer.
//!
//! DIFFICULTY CURVE (by level number n):
//!   grid size  = min(max_grid_size, 4 + (n - 1) / 2)
//!   obstacles  = n - 1, capped by the cells left after the corridor
//!
//! The robot starts in a corner; the goal is at least `size - 1` steps away.
//! One monotone corridor from start to goal is always kept free of
//! obstacles. That is a construction rule, not a solvability check.

use crate::{
    grid::Position,
    loader::LevelProvider,
    rng::LevelRng,
    types::LevelNumber,
};
use serde_json::json;
use std::collections::BTreeSet;
use std::future::Future;

const MESSAGES: &[&str] = &[
    "Guide the robot to the charging pad!",
    "Watch out for the space rocks!",
    "Mission control says: plan every step.",
    "Beep boop! Can you find the way?",
    "The rover needs your program to get home.",
];

#[derive(Debug, Clone)]
pub struct ProceduralLevelProvider {
    seed:          u64,
    max_grid_size: u32,
}

impl ProceduralLevelProvider {
    pub fn new(seed: u64, max_grid_size: u32) -> Self {
        Self { seed, max_grid_size: max_grid_size.max(2) }
    }

    pub fn grid_size_for(&self, level: LevelNumber) -> u32 {
        (4 + level.saturating_sub(1) / 2).min(self.max_grid_size)
    }

    /// Build the payload for `level` in the provider's JSON shape.
    pub fn generate(&self, level: LevelNumber) -> serde_json::Value {
        let mut rng = LevelRng::for_level(self.seed, level as u64);
        let size = self.grid_size_for(level);
        let far = size - 1;

        let corners = [
            Position::new(0, 0),
            Position::new(far, 0),
            Position::new(0, far),
            Position::new(far, far),
        ];
        let start = *rng.pick(&corners);

        let goals: Vec<Position> = cells(size)
            .filter(|c| distance(*c, start) >= far)
            .collect();
        let goal = *rng.pick(&goals);

        let corridor = corridor(start, goal, rng.coin());
        let mut free: Vec<Position> = cells(size).filter(|c| !corridor.contains(c)).collect();
        let count = (level.saturating_sub(1) as usize).min(free.len());
        rng.choose_prefix(&mut free, count);
        let mut obstacles = free[..count].to_vec();
        obstacles.sort();

        log::debug!(
            "generated level {level}: {size}x{size} start={start} goal={goal} obstacles={}",
            obstacles.len()
        );

        json!({
            "gridSize": size,
            "robotPos": { "x": start.x, "y": start.y },
            "goalPos":  { "x": goal.x,  "y": goal.y  },
            "obstacles": obstacles
                .iter()
                .map(|p| json!({ "x": p.x, "y": p.y }))
                .collect::<Vec<_>>(),
            "message": *rng.pick(MESSAGES),
        })
    }
}

impl LevelProvider for ProceduralLevelProvider {
    fn request_level(
        &self,
        level: LevelNumber,
    ) -> impl Future<Output = anyhow::Result<String>> + Send {
        let payload = self.generate(level);
        async move { Ok(serde_json::to_string(&payload)?) }
    }
}

fn cells(size: u32) -> impl Iterator<Item = Position> {
    (0..size).flat_map(move |y| (0..size).map(move |x| Position::new(x, y)))
}

fn distance(a: Position, b: Position) -> u32 {
    a.x.abs_diff(b.x) + a.y.abs_diff(b.y)
}

/// Cells of an L-shaped path from `from` to `to`, both ends included.
fn corridor(from: Position, to: Position, horizontal_first: bool) -> BTreeSet<Position> {
    let corner = if horizontal_first {
        Position::new(to.x, from.y)
    } else {
        Position::new(from.x, to.y)
    };
    let mut path = BTreeSet::new();
    for (a, b) in [(from, corner), (corner, to)] {
        for x in a.x.min(b.x)..=a.x.max(b.x) {
            for y in a.y.min(b.y)..=a.y.max(b.y) {
                path.insert(Position::new(x, y));
            }
        }
    }
    path
}
