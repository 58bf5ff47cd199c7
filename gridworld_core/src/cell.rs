use serde::{Deserialize, Serialize};

use crate::{Item, OccupantId};

/// A single grid position.
///
/// An obstacle cell never hosts an occupant. Items are not collected by
/// standing on a cell; they stay until picked up explicitly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub(crate) obstacle: bool,
    pub(crate) occupant: Option<OccupantId>,
    pub(crate) items: Vec<Item>,
}

impl Cell {
    /// An open, unoccupied cell without items.
    pub fn floor() -> Self {
        Cell::default()
    }

    pub fn obstacle() -> Self {
        Cell {
            obstacle: true,
            ..Cell::default()
        }
    }

    pub fn with_items(items: Vec<Item>) -> Self {
        Cell {
            items,
            ..Cell::default()
        }
    }

    /// Builder used when replacing a cell that currently hosts an occupant.
    pub fn with_occupant(mut self, occupant: Option<OccupantId>) -> Self {
        self.occupant = occupant;
        self
    }

    pub fn is_obstacle(&self) -> bool {
        self.obstacle
    }

    pub fn occupant(&self) -> Option<OccupantId> {
        self.occupant
    }

    /// Items in placement order; the last one is picked up first.
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn has_items(&self) -> bool {
        !self.items.is_empty()
    }

    /// Removes and returns the most recently added item.
    pub fn pick_up(&mut self) -> Option<Item> {
        self.items.pop()
    }

    /// True iff the cell is walkable, unoccupied and holds no items.
    pub fn is_empty(&self) -> bool {
        !self.obstacle && self.occupant.is_none() && self.items.is_empty()
    }

    pub(crate) fn push_item(&mut self, item: Item) {
        self.items.push(item);
    }
}
