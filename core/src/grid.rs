//! Grid geometry: cells, the four movement commands, and boundary clamping.
//!
//! RULE: every move is clamped per axis. A move against a wall is absorbed;
//! it never wraps, errors, or touches the other axis.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A cell on the grid. (0, 0) is the top-left corner; `y` grows downward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub x: u32,
    pub y: u32,
}

impl Position {
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    pub fn within(&self, grid_size: u32) -> bool {
        self.x < grid_size && self.y < grid_size
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.x, self.y)
    }
}

/// One player command. The queue is a list of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [Self::Up, Self::Down, Self::Left, Self::Right];

    /// Apply this command to `from` on a `grid_size` grid, clamping each axis
    /// to `[0, grid_size - 1]`.
    pub fn apply(self, from: Position, grid_size: u32) -> Position {
        let max = grid_size.saturating_sub(1);
        let Position { mut x, mut y } = from;
        match self {
            Self::Up    => y = y.saturating_sub(1),
            Self::Down  => y = (y + 1).min(max),
            Self::Left  => x = x.saturating_sub(1),
            Self::Right => x = (x + 1).min(max),
        }
        Position { x, y }
    }

    /// Single-letter form used by the headless runner: U, D, L, R.
    pub fn from_letter(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'U' => Some(Self::Up),
            'D' => Some(Self::Down),
            'L' => Some(Self::Left),
            'R' => Some(Self::Right),
            _ => None,
        }
    }

    pub fn letter(self) -> char {
        match self {
            Self::Up    => 'U',
            Self::Down  => 'D',
            Self::Left  => 'L',
            Self::Right => 'R',
        }
    }
}

/// Parse a command string such as "RRDL". Whitespace and commas are ignored;
/// any other character rejects the whole string.
pub fn parse_commands(s: &str) -> Option<Vec<Direction>> {
    s.chars()
        .filter(|c| !c.is_whitespace() && *c != ',')
        .map(Direction::from_letter)
        .collect()
}
