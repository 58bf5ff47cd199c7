use std::{collections::BTreeMap, sync::Arc};

use parking_lot::Mutex;

use crate::{
    Item, OccupantId, Position,
    action::{Direction, Outcome},
    cell::Cell,
    world::{GridWorld, WorldError, WorldSnapshot},
};

/// A cloneable handle for driving one world from several threads.
///
/// Each call holds the lock for its whole check-then-mutate sequence, so two
/// occupants racing for the same cell are serialized: one moves, the other
/// sees the cell occupied.
#[derive(Debug, Clone)]
pub struct SharedWorld {
    inner: Arc<Mutex<GridWorld>>,
}

impl SharedWorld {
    pub fn new(world: GridWorld) -> Self {
        SharedWorld {
            inner: Arc::new(Mutex::new(world)),
        }
    }

    pub fn step(&self, id: OccupantId, direction: Direction) -> Outcome {
        self.inner.lock().step(id, direction)
    }

    pub fn step_command(&self, id: OccupantId, action: &str) -> Outcome {
        self.inner.lock().step_command(id, action)
    }

    pub fn reset(&self) -> BTreeMap<OccupantId, Position> {
        self.inner.lock().reset().clone()
    }

    pub fn position(&self, id: OccupantId) -> Option<Position> {
        self.inner.lock().position(id)
    }

    pub fn positions(&self) -> BTreeMap<OccupantId, Position> {
        self.inner.lock().positions().clone()
    }

    pub fn cell_at(&self, pos: Position) -> Result<Cell, WorldError> {
        Ok(self.inner.lock().cell_at(pos)?.clone())
    }

    pub fn set_cell(&self, pos: Position, cell: Cell) -> Result<Cell, WorldError> {
        self.inner.lock().set_cell(pos, cell)
    }

    pub fn place_item(&self, pos: Position, item: Item) -> Result<(), WorldError> {
        self.inner.lock().place_item(pos, item)
    }

    pub fn set_obstacle(&self, pos: Position, obstacle: bool) -> Result<(), WorldError> {
        self.inner.lock().set_obstacle(pos, obstacle)
    }

    pub fn snapshot(&self) -> WorldSnapshot {
        self.inner.lock().snapshot()
    }

    /// Runs `f` with exclusive access, for sequences that must not interleave.
    pub fn with<R>(&self, f: impl FnOnce(&mut GridWorld) -> R) -> R {
        f(&mut *self.inner.lock())
    }
}

impl From<GridWorld> for SharedWorld {
    fn from(world: GridWorld) -> Self {
        SharedWorld::new(world)
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    #[test]
    fn test_racing_occupants_single_winner() {
        // 0 at (0, 0) and 1 at (0, 2) both want (0, 1).
        for _ in 0..50 {
            let world = SharedWorld::new(
                GridWorld::new(
                    1,
                    3,
                    [(0, Position::new(0, 0)), (1, Position::new(0, 2))],
                    [],
                    [],
                )
                .unwrap(),
            );

            let east = {
                let world = world.clone();
                thread::spawn(move || world.step(0, Direction::East))
            };
            let west = {
                let world = world.clone();
                thread::spawn(move || world.step(1, Direction::West))
            };
            let outcomes = [east.join().unwrap(), west.join().unwrap()];

            assert_eq!(outcomes.iter().filter(|o| o.is_success()).count(), 1);
            assert!(
                outcomes
                    .iter()
                    .any(|o| matches!(o, Outcome::Occupied { at, .. } if *at == Position::new(0, 1)))
            );
            world.with(|w| w.check_invariants()).unwrap();
        }
    }

    #[test]
    fn test_handle_delegates() {
        let world = SharedWorld::from(GridWorld::with_defaults(3, 3).unwrap());
        assert!(world.step_command(0, "north").is_success());
        assert_eq!(world.position(0), Some(Position::new(1, 0)));

        world.place_item(Position::new(2, 2), Item::target()).unwrap();
        assert!(world.cell_at(Position::new(2, 2)).unwrap().has_items());
        assert!(world.cell_at(Position::new(3, 0)).is_err());

        world.set_obstacle(Position::new(2, 0), true).unwrap();
        assert!(matches!(
            world.step(0, Direction::North),
            Outcome::Blocked { .. }
        ));

        let previous = world.set_cell(Position::new(2, 0), Cell::floor()).unwrap();
        assert!(previous.is_obstacle());

        let restored = world.reset();
        assert_eq!(restored, world.positions());
        assert_eq!(world.snapshot().position(0), Some(Position::new(0, 0)));
    }
}
