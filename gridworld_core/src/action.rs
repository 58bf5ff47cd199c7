use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{OccupantId, Position};

/// One of the four single-step moves. North increases the row, east the column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    North,
    South,
    East,
    West,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::North => "north",
            Direction::South => "south",
            Direction::East => "east",
            Direction::West => "west",
        }
    }

    /// Moves `from` one step in this direction, saturating at the grid edge.
    ///
    /// A move against the boundary returns `from` unchanged.
    pub fn step_clamped(self, from: Position, rows: usize, cols: usize) -> Position {
        let Position { row, col } = from;
        match self {
            Direction::North => Position::new((row + 1).min(rows.saturating_sub(1)), col),
            Direction::South => Position::new(row.saturating_sub(1), col),
            Direction::East => Position::new(row, (col + 1).min(cols.saturating_sub(1))),
            Direction::West => Position::new(row, col.saturating_sub(1)),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid action: '{0}'. Valid actions are ['north', 'south', 'east', 'west'].")]
pub struct ParseDirectionError(pub String);

impl FromStr for Direction {
    type Err = ParseDirectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "north" => Ok(Direction::North),
            "south" => Ok(Direction::South),
            "east" => Ok(Direction::East),
            "west" => Ok(Direction::West),
            _ => Err(ParseDirectionError(s.to_string())),
        }
    }
}

/// Result of a single `step` attempt.
///
/// Every variant other than `Moved` leaves the world untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Moved {
        id: OccupantId,
        direction: Direction,
        from: Position,
        to: Position,
    },
    /// The move was clamped at the grid edge.
    NoOp {
        id: OccupantId,
        direction: Direction,
    },
    Blocked {
        id: OccupantId,
        at: Position,
    },
    Occupied {
        id: OccupantId,
        at: Position,
        by: OccupantId,
    },
    UnknownOccupant {
        id: OccupantId,
    },
    InvalidAction {
        id: OccupantId,
        action: String,
    },
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Moved { .. })
    }

    pub fn occupant(&self) -> OccupantId {
        match *self {
            Outcome::Moved { id, .. }
            | Outcome::NoOp { id, .. }
            | Outcome::Blocked { id, .. }
            | Outcome::Occupied { id, .. }
            | Outcome::UnknownOccupant { id }
            | Outcome::InvalidAction { id, .. } => id,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Moved {
                id,
                direction,
                from,
                to,
            } => write!(f, "Agent {id} moved '{direction}' from {from} to {to}."),
            Outcome::NoOp { id, direction } => write!(
                f,
                "Agent {id} tried to move '{direction}', but it cannot move further in that direction."
            ),
            Outcome::Blocked { id, at } => {
                write!(f, "Agent {id} cannot move into obstacle at {at}.")
            }
            Outcome::Occupied { id, at, by } => {
                write!(f, "Agent {id} cannot move into {at}, occupied by agent {by}.")
            }
            Outcome::UnknownOccupant { id } => {
                write!(f, "Agent ID {id} not found in the environment.")
            }
            Outcome::InvalidAction { action, .. } => {
                write!(f, "{}", ParseDirectionError(action.clone()))
            }
        }
    }
}
