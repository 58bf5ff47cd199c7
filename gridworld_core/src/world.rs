use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    Item, OccupantId, Position,
    action::{Direction, Outcome},
    cell::Cell,
    map::{Grid, GridError},
};

/// Errors raised by construction and by explicit mutations of a [`GridWorld`].
///
/// Movement never produces one of these; see [`Outcome`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorldError {
    #[error("Grid dimensions ({rows}, {cols}) must be non-zero and fit in memory")]
    BadDimensions { rows: usize, cols: usize },
    #[error(transparent)]
    OutOfBounds(#[from] GridError),
    #[error("Occupant {id} is listed more than once")]
    DuplicateOccupant { id: OccupantId },
    #[error("Occupant {id} cannot start inside the obstacle at {at}")]
    ObstacleStart { id: OccupantId, at: Position },
    #[error("Occupants {first} and {second} share the start position {at}")]
    OccupiedStart {
        first: OccupantId,
        second: OccupantId,
        at: Position,
    },
    #[error("Cell {at} is the start cell of occupant {id} and cannot become an obstacle")]
    StartCellObstacle { at: Position, id: OccupantId },
    #[error("Cell {at} is occupied by occupant {id}")]
    CellOccupied { at: Position, id: OccupantId },
    #[error("Replacement for cell {at} must keep occupant {expected:?}, found {found:?}")]
    OccupantMismatch {
        at: Position,
        expected: Option<OccupantId>,
        found: Option<OccupantId>,
    },
    #[error("Occupant {id} is recorded at {recorded} but the grid disagrees")]
    Inconsistent { id: OccupantId, recorded: Position },
    #[error("Occupant {0} not found")]
    UnknownOccupant(OccupantId),
}

/// The grid-world state machine.
///
/// Owns the cells and the authoritative occupant → position map. After
/// every public mutation, `positions[id]` names the one cell whose occupant
/// is `id`.
#[derive(Debug, Clone, PartialEq)]
pub struct GridWorld {
    cells: Grid<Cell>,
    positions: BTreeMap<OccupantId, Position>,
    start_positions: BTreeMap<OccupantId, Position>,
}

impl GridWorld {
    /// Builds a world, rejecting any placement outside the grid, any occupant
    /// starting on an obstacle and any two occupants sharing a cell.
    pub fn new(
        rows: usize,
        cols: usize,
        start_positions: impl IntoIterator<Item = (OccupantId, Position)>,
        obstacles: impl IntoIterator<Item = Position>,
        items: impl IntoIterator<Item = (Position, Vec<Item>)>,
    ) -> Result<Self, WorldError> {
        let bytes = rows
            .checked_mul(cols)
            .and_then(|count| count.checked_mul(size_of::<Cell>()));
        if rows == 0 || cols == 0 || bytes.is_none_or(|bytes| bytes > isize::MAX as usize) {
            return Err(WorldError::BadDimensions { rows, cols });
        }
        let mut cells: Grid<Cell> = Grid::new(rows, cols);

        for pos in obstacles {
            cells.get_mut(pos)?.obstacle = true;
        }

        for (pos, list) in items {
            cells.get_mut(pos)?.items.extend(list);
        }

        let mut positions = BTreeMap::new();
        for (id, pos) in start_positions {
            let cell = cells.get_mut(pos)?;
            if cell.obstacle {
                return Err(WorldError::ObstacleStart { id, at: pos });
            }
            if let Some(first) = cell.occupant {
                return Err(WorldError::OccupiedStart {
                    first,
                    second: id,
                    at: pos,
                });
            }
            if positions.insert(id, pos).is_some() {
                return Err(WorldError::DuplicateOccupant { id });
            }
            cell.occupant = Some(id);
        }

        info!(
            rows,
            cols,
            occupants = positions.len(),
            "grid world constructed"
        );

        Ok(GridWorld {
            cells,
            start_positions: positions.clone(),
            positions,
        })
    }

    /// A world with a single occupant `0` at `(0, 0)` and nothing else.
    pub fn with_defaults(rows: usize, cols: usize) -> Result<Self, WorldError> {
        Self::new(rows, cols, [(0, Position::new(0, 0))], [], [])
    }

    pub fn rows(&self) -> usize {
        self.cells.rows()
    }

    pub fn cols(&self) -> usize {
        self.cells.cols()
    }

    /// Returns `(rows, cols)`.
    pub fn dimensions(&self) -> (usize, usize) {
        (self.rows(), self.cols())
    }

    pub fn cells(&self) -> &Grid<Cell> {
        &self.cells
    }

    pub fn cell_at(&self, pos: Position) -> Result<&Cell, GridError> {
        self.cells.get(pos)
    }

    /// Replaces one cell wholesale and returns the previous cell.
    ///
    /// The replacement must carry the same occupant as the cell it replaces,
    /// and may only be an obstacle if that occupant is `None`.
    pub fn set_cell(&mut self, pos: Position, cell: Cell) -> Result<Cell, WorldError> {
        self.cells.check(pos)?;
        let current = &self.cells[pos];
        if cell.occupant != current.occupant {
            warn!(%pos, "rejected cell replacement that changes the occupant");
            return Err(WorldError::OccupantMismatch {
                at: pos,
                expected: current.occupant,
                found: cell.occupant,
            });
        }
        if let (true, Some(id)) = (cell.obstacle, cell.occupant) {
            warn!(%pos, id, "rejected obstacle over an occupant");
            return Err(WorldError::CellOccupied { at: pos, id });
        }
        if cell.obstacle {
            self.ensure_not_start_cell(pos)?;
        }
        Ok(self.cells.set(pos, cell)?)
    }

    /// Appends an item to the cell at `pos`.
    pub fn place_item(&mut self, pos: Position, item: Item) -> Result<(), WorldError> {
        debug!(%pos, %item, "item placed");
        self.cells.get_mut(pos)?.push_item(item);
        Ok(())
    }

    /// Marks or clears an obstacle. Neither an occupied cell nor a start
    /// cell can become an obstacle.
    pub fn set_obstacle(&mut self, pos: Position, obstacle: bool) -> Result<(), WorldError> {
        self.cells.check(pos)?;
        if obstacle {
            if let Some(id) = self.cells[pos].occupant {
                warn!(%pos, id, "rejected obstacle over an occupant");
                return Err(WorldError::CellOccupied { at: pos, id });
            }
            self.ensure_not_start_cell(pos)?;
        }
        self.cells[pos].obstacle = obstacle;
        Ok(())
    }

    /// `reset` puts occupants back on their start cells, so those cells must
    /// stay walkable.
    fn ensure_not_start_cell(&self, pos: Position) -> Result<(), WorldError> {
        match self.start_positions.iter().find(|&(_, &start)| start == pos) {
            Some((&id, _)) => {
                warn!(%pos, id, "rejected obstacle on a start cell");
                Err(WorldError::StartCellObstacle { at: pos, id })
            }
            None => Ok(()),
        }
    }

    /// Removes the most recently placed item at `pos`.
    pub fn take_item(&mut self, pos: Position) -> Result<Option<Item>, WorldError> {
        Ok(self.cells.get_mut(pos)?.pick_up())
    }

    /// The occupant picks up the top item of the cell it stands on.
    pub fn pick_up(&mut self, id: OccupantId) -> Result<Option<Item>, WorldError> {
        let pos = self.position(id).ok_or(WorldError::UnknownOccupant(id))?;
        let item = self.cells[pos].pick_up();
        debug!(id, %pos, picked = item.is_some(), "pick up");
        Ok(item)
    }

    /// Applies one parsed move for `id`.
    ///
    /// Checks run in a fixed order: unknown occupant, edge clamp, obstacle,
    /// occupied destination. Only the last branch mutates the world.
    pub fn step(&mut self, id: OccupantId, direction: Direction) -> Outcome {
        let Some(&from) = self.positions.get(&id) else {
            return traced(Outcome::UnknownOccupant { id });
        };

        let to = direction.step_clamped(from, self.rows(), self.cols());
        if to == from {
            return traced(Outcome::NoOp { id, direction });
        }

        let target = &self.cells[to];
        if target.obstacle {
            return traced(Outcome::Blocked { id, at: to });
        }
        if let Some(by) = target.occupant {
            return traced(Outcome::Occupied { id, at: to, by });
        }

        self.cells[from].occupant = None;
        self.cells[to].occupant = Some(id);
        self.positions.insert(id, to);

        traced(Outcome::Moved {
            id,
            direction,
            from,
            to,
        })
    }

    /// Like [`GridWorld::step`] but takes the action as text, as a driver
    /// would receive it. An unknown occupant is reported before a bad action.
    pub fn step_command(&mut self, id: OccupantId, action: &str) -> Outcome {
        if !self.positions.contains_key(&id) {
            return traced(Outcome::UnknownOccupant { id });
        }
        match action.parse::<Direction>() {
            Ok(direction) => self.step(id, direction),
            Err(err) => traced(Outcome::InvalidAction { id, action: err.0 }),
        }
    }

    /// Puts every occupant back on its start cell.
    ///
    /// Obstacles and items keep their current state; only occupant placement
    /// is restored.
    pub fn reset(&mut self) -> &BTreeMap<OccupantId, Position> {
        for cell in self.cells.iter_mut() {
            cell.occupant = None;
        }
        self.positions = self.start_positions.clone();
        for (&id, &pos) in &self.positions {
            self.cells[pos].occupant = Some(id);
        }
        info!(occupants = self.positions.len(), "occupants reset");
        &self.positions
    }

    pub fn position(&self, id: OccupantId) -> Option<Position> {
        self.positions.get(&id).copied()
    }

    pub fn positions(&self) -> &BTreeMap<OccupantId, Position> {
        &self.positions
    }

    pub fn start_positions(&self) -> &BTreeMap<OccupantId, Position> {
        &self.start_positions
    }

    pub fn occupants(&self) -> impl Iterator<Item = OccupantId> + '_ {
        self.positions.keys().copied()
    }

    /// Copies the observable state for a renderer or a controller.
    pub fn snapshot(&self) -> WorldSnapshot {
        WorldSnapshot {
            cells: self.cells.clone(),
            positions: self.positions.clone(),
        }
    }

    /// Verifies the two-way occupant/position mapping and that no obstacle
    /// hosts an occupant.
    pub fn check_invariants(&self) -> Result<(), WorldError> {
        for (&id, &recorded) in &self.positions {
            match self.cells.get(recorded) {
                Ok(cell) if cell.occupant == Some(id) => {}
                _ => return Err(WorldError::Inconsistent { id, recorded }),
            }
        }
        for (pos, cell) in self.cells.enumerate() {
            let Some(id) = cell.occupant else { continue };
            if cell.obstacle {
                return Err(WorldError::CellOccupied { at: pos, id });
            }
            match self.positions.get(&id) {
                Some(&recorded) if recorded == pos => {}
                Some(&recorded) => return Err(WorldError::Inconsistent { id, recorded }),
                None => return Err(WorldError::UnknownOccupant(id)),
            }
        }
        Ok(())
    }
}

fn traced(outcome: Outcome) -> Outcome {
    debug!(occupant = outcome.occupant(), moved = outcome.is_success(), "{outcome}");
    outcome
}

/// A read-only copy of the world handed to renderers and controllers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub cells: Grid<Cell>,
    pub positions: BTreeMap<OccupantId, Position>,
}

impl WorldSnapshot {
    pub fn rows(&self) -> usize {
        self.cells.rows()
    }

    pub fn cols(&self) -> usize {
        self.cells.cols()
    }

    pub fn cell(&self, pos: Position) -> Option<&Cell> {
        self.cells.get(pos).ok()
    }

    pub fn position(&self, id: OccupantId) -> Option<Position> {
        self.positions.get(&id).copied()
    }
}
