use std::fmt;

use serde::{Deserialize, Serialize};

pub mod action;
pub mod agent;
pub mod cell;
pub mod config;
pub mod map;
pub mod shared;
pub mod world;

/// Unique identifier for occupants (the mobile entities on the grid).
pub type OccupantId = u32;

/// Represents a 2D coordinate as `(row, col)`.
///
/// Rows grow towards the north, columns towards the east.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

impl Position {
    pub const fn new(row: usize, col: usize) -> Self {
        Position { row, col }
    }
}

impl From<(usize, usize)> for Position {
    fn from((row, col): (usize, usize)) -> Self {
        Position { row, col }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// An RGB color triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

/// A pickup lying in a cell.
///
/// Items have value identity: two items with the same category, color and
/// shape are interchangeable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Item {
    pub category: String,
    pub color: Rgb,
    pub shape: String,
}

impl Item {
    pub fn new(category: impl Into<String>, color: Rgb, shape: impl Into<String>) -> Self {
        Item {
            category: category.into(),
            color,
            shape: shape.into(),
        }
    }

    /// The marker item drivers use for a destination cell.
    pub fn target() -> Self {
        Item::new("target", Rgb(0, 0, 100), "circle")
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Rgb(r, g, b) = self.color;
        write!(f, "{} {} ({r}, {g}, {b})", self.shape, self.category)
    }
}
