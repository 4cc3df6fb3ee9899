//! Map coordinates and compass directions.
//!
//! The map is a rectangular grid in native coordinates: `x` is the column,
//! `y` is the row, and `(0, 0)` is the north-west corner.

use serde::{Deserialize, Serialize};

/// Native map coordinates.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
pub struct MapCoord {
    /// Column coordinate
    pub x: i32,
    /// Row coordinate
    pub y: i32,
}

impl PartialOrd for MapCoord {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MapCoord {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Row-major ordering for deterministic iteration
        (self.y, self.x).cmp(&(other.y, other.x))
    }
}

impl MapCoord {
    /// Create a new coordinate.
    #[inline]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The coordinate one step away in `dir`, without any wrapping.
    #[inline]
    pub const fn step(&self, dir: Direction8) -> MapCoord {
        let (dx, dy) = dir.offset();
        MapCoord::new(self.x + dx, self.y + dy)
    }
}

impl std::fmt::Display for MapCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// The eight compass directions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction8 {
    NorthWest,
    North,
    NorthEast,
    West,
    East,
    SouthWest,
    South,
    SouthEast,
}

impl Direction8 {
    /// All directions in their canonical order.
    pub const ALL: [Direction8; 8] = [
        Direction8::NorthWest,
        Direction8::North,
        Direction8::NorthEast,
        Direction8::West,
        Direction8::East,
        Direction8::SouthWest,
        Direction8::South,
        Direction8::SouthEast,
    ];

    /// Column and row delta of one step in this direction.
    pub const fn offset(&self) -> (i32, i32) {
        match self {
            Direction8::NorthWest => (-1, -1),
            Direction8::North => (0, -1),
            Direction8::NorthEast => (1, -1),
            Direction8::West => (-1, 0),
            Direction8::East => (1, 0),
            Direction8::SouthWest => (-1, 1),
            Direction8::South => (0, 1),
            Direction8::SouthEast => (1, 1),
        }
    }

    /// The direction pointing back.
    pub const fn opposite(&self) -> Direction8 {
        match self {
            Direction8::NorthWest => Direction8::SouthEast,
            Direction8::North => Direction8::South,
            Direction8::NorthEast => Direction8::SouthWest,
            Direction8::West => Direction8::East,
            Direction8::East => Direction8::West,
            Direction8::SouthWest => Direction8::NorthEast,
            Direction8::South => Direction8::North,
            Direction8::SouthEast => Direction8::NorthWest,
        }
    }

    /// Check if this is one of the four cardinal directions.
    pub const fn is_cardinal(&self) -> bool {
        matches!(
            self,
            Direction8::North | Direction8::East | Direction8::South | Direction8::West
        )
    }
}

impl std::fmt::Display for Direction8 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Direction8::NorthWest => "northwest",
            Direction8::North => "north",
            Direction8::NorthEast => "northeast",
            Direction8::West => "west",
            Direction8::East => "east",
            Direction8::SouthWest => "southwest",
            Direction8::South => "south",
            Direction8::SouthEast => "southeast",
        };
        f.write_str(name)
    }
}
