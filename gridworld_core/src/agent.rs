use rand::{Rng, SeedableRng, rngs::StdRng, seq::IndexedRandom};

use crate::{OccupantId, Position, action::Direction, world::WorldSnapshot};

/// Trait defining the decision side of an occupant.
/// Controllers pick a direction from a snapshot; the world applies it.
pub trait Controller {
    /// Returns the occupant this controller drives.
    fn id(&self) -> OccupantId;

    /// Chooses the next move. `&mut self` lets a controller keep its own state.
    fn next_direction(&mut self, view: &WorldSnapshot) -> Direction;
}

/// A controller that moves in a uniformly random direction.
#[derive(Debug)]
pub struct RandomWalker {
    id: OccupantId,
    rng: StdRng,
}

impl RandomWalker {
    pub fn new(id: OccupantId, seed: u64) -> Self {
        Self {
            id,
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Controller for RandomWalker {
    fn id(&self) -> OccupantId {
        self.id
    }

    fn next_direction(&mut self, _view: &WorldSnapshot) -> Direction {
        Direction::ALL[self.rng.random_range(0..Direction::ALL.len())]
    }
}

/// Greedy controller that heads for a target cell.
///
/// Picks any free neighbour that shortens the manhattan distance, and falls
/// back to a random direction when none exists. It does not plan around
/// obstacles.
#[derive(Debug)]
pub struct TargetSeeker {
    id: OccupantId,
    target: Position,
    rng: StdRng,
}

impl TargetSeeker {
    pub fn new(id: OccupantId, target: Position, seed: u64) -> Self {
        Self {
            id,
            target,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn target(&self) -> Position {
        self.target
    }
}

fn manhattan_distance(a: Position, b: Position) -> usize {
    a.row.abs_diff(b.row) + a.col.abs_diff(b.col)
}

impl Controller for TargetSeeker {
    fn id(&self) -> OccupantId {
        self.id
    }

    fn next_direction(&mut self, view: &WorldSnapshot) -> Direction {
        let Some(current) = view.position(self.id) else {
            return Direction::North;
        };
        let distance = manhattan_distance(current, self.target);

        let closer: Vec<Direction> = Direction::ALL
            .into_iter()
            .filter(|direction| {
                let next = direction.step_clamped(current, view.rows(), view.cols());
                manhattan_distance(next, self.target) < distance
                    && view
                        .cell(next)
                        .is_some_and(|cell| !cell.is_obstacle() && cell.occupant().is_none())
            })
            .collect();

        match closer.choose(&mut self.rng) {
            Some(&direction) => direction,
            None => Direction::ALL[self.rng.random_range(0..Direction::ALL.len())],
        }
    }
}
