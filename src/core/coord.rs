//! Grid Coordinates
//!
//! Integer board coordinates and the four orthogonal step directions.
//! `y` grows downward: `Down` (south) is `y + 1`.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Deserialize};

/// A cell coordinate on the board.
///
/// Signed so that neighbor arithmetic at the border yields an
/// out-of-bounds coordinate instead of wrapping.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Coord {
    /// Column
    pub x: i32,
    /// Row (0 = top)
    pub y: i32,
}

impl Coord {
    /// Create a coordinate.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Coordinate one step in `dir`.
    #[inline]
    pub fn step(self, dir: Direction) -> Self {
        let (dx, dy) = dir.delta();
        Self::new(self.x + dx, self.y + dy)
    }

    /// Manhattan distance.
    #[inline]
    pub fn manhattan(self, other: Coord) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// True if `other` is exactly one orthogonal step away.
    #[inline]
    pub fn is_adjacent(self, other: Coord) -> bool {
        self.manhattan(other) == 1
    }

    /// Wire representation.
    pub fn to_array(self) -> [i32; 2] {
        [self.x, self.y]
    }
}

impl From<(i32, i32)> for Coord {
    fn from((x, y): (i32, i32)) -> Self {
        Self::new(x, y)
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Orthogonal step direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// y - 1
    Up,
    /// y + 1
    Down,
    /// x - 1
    Left,
    /// x + 1
    Right,
}

impl Direction {
    /// (dx, dy) for one step.
    #[inline]
    pub const fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }
}

/// A movement token that is not a recognized direction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized movement token: {0:?}")]
pub struct UnknownDirection(pub String);

impl FromStr for Direction {
    type Err = UnknownDirection;

    /// Accepts `up/down/left/right`, compass names and `u/d/l/r`,
    /// ignoring ASCII case.
    fn from_str(token: &str) -> Result<Self, Self::Err> {
        match token.trim().to_ascii_lowercase().as_str() {
            "up" | "north" | "u" => Ok(Direction::Up),
            "down" | "south" | "d" => Ok(Direction::Down),
            "left" | "west" | "l" => Ok(Direction::Left),
            "right" | "east" | "r" => Ok(Direction::Right),
            _ => Err(UnknownDirection(token.to_string())),
        }
    }
}
