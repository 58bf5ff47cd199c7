//! Property tests for the grid world state machine.
//!
//! Random worlds are driven through random sequences of steps, resets and
//! explicit cell mutations; after each call the occupant/position mapping
//! must still agree with the cells.

use std::collections::BTreeSet;

use gridworld_core::{
    Item, OccupantId, Position,
    action::{Direction, Outcome},
    cell::Cell,
    world::GridWorld,
};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Command {
    Step(OccupantId, Direction),
    Text(OccupantId, String),
    Reset,
    SetObstacle(Position, bool),
    /// Replace a cell; `keep_occupant` copies the current occupant across.
    SetCell {
        at: Position,
        obstacle: bool,
        keep_occupant: bool,
    },
    PlaceItem(Position),
    TakeItem(Position),
    PickUp(OccupantId),
}

fn direction() -> impl Strategy<Value = Direction> {
    prop::sample::select(Direction::ALL.to_vec())
}

fn command(occupants: u32, rows: usize, cols: usize) -> impl Strategy<Value = Command> {
    let position = (0..rows, 0..cols).prop_map(|(row, col)| Position::new(row, col));
    prop_oneof![
        8 => (0..occupants + 1, direction()).prop_map(|(id, d)| Command::Step(id, d)),
        2 => (0..occupants, "[a-z]{0,6}").prop_map(|(id, s)| Command::Text(id, s)),
        1 => Just(Command::Reset),
        2 => (position.clone(), any::<bool>()).prop_map(|(at, on)| Command::SetObstacle(at, on)),
        2 => (position.clone(), any::<bool>(), any::<bool>()).prop_map(
            |(at, obstacle, keep_occupant)| Command::SetCell { at, obstacle, keep_occupant }
        ),
        1 => position.clone().prop_map(Command::PlaceItem),
        1 => position.prop_map(Command::TakeItem),
        1 => (0..occupants + 1).prop_map(Command::PickUp),
    ]
}

/// A world with distinct occupant and obstacle cells, plus a command script.
fn scenario() -> impl Strategy<Value = (GridWorld, Vec<Command>)> {
    (1usize..8, 1usize..8)
        .prop_flat_map(|(rows, cols)| {
            let cells = rows * cols;
            (
                Just((rows, cols)),
                prop::sample::subsequence((0..cells).collect::<Vec<_>>(), 0..=cells),
            )
        })
        .prop_flat_map(|((rows, cols), picked)| {
            let occupants = picked.len().clamp(1, 4) as u32;
            (
                Just((rows, cols)),
                Just(picked),
                prop::collection::vec(command(occupants, rows, cols), 0..60),
            )
        })
        .prop_filter_map("need at least one free cell", |((rows, cols), picked, script)| {
            if picked.is_empty() {
                return None;
            }
            let at = |index: usize| Position::new(index / cols, index % cols);
            let occupant_count = picked.len().min(4);
            let occupants = picked[..occupant_count]
                .iter()
                .enumerate()
                .map(|(id, &index)| (id as OccupantId, at(index)));
            let obstacles = picked[occupant_count..].iter().map(|&index| at(index));
            let world = GridWorld::new(rows, cols, occupants, obstacles, []).ok()?;
            Some((world, script))
        })
}

fn manhattan(a: Position, b: Position) -> usize {
    a.row.abs_diff(b.row) + a.col.abs_diff(b.col)
}

fn obstacle_cells(world: &GridWorld) -> BTreeSet<Position> {
    world
        .cells()
        .enumerate()
        .filter(|(_, cell)| cell.is_obstacle())
        .map(|(pos, _)| pos)
        .collect()
}

proptest! {
    #[test]
    fn mapping_stays_consistent((mut world, script) in scenario()) {
        let mut obstacles = obstacle_cells(&world);
        let starts: BTreeSet<Position> = world.start_positions().values().copied().collect();

        for command in script {
            let before = world.positions().clone();
            match command {
                Command::Step(id, direction) => {
                    let outcome = world.step(id, direction);
                    match (&outcome, before.get(&id)) {
                        (Outcome::Moved { from, to, .. }, Some(&start)) => {
                            prop_assert_eq!(*from, start);
                            prop_assert_eq!(manhattan(*from, *to), 1);
                            prop_assert_eq!(
                                *to,
                                direction.step_clamped(start, world.rows(), world.cols())
                            );
                            prop_assert!(!obstacles.contains(to));
                        }
                        (Outcome::UnknownOccupant { .. }, None) => {
                            prop_assert_eq!(world.positions(), &before);
                        }
                        (_, Some(_)) => prop_assert_eq!(world.positions(), &before),
                        (other, None) => prop_assert!(false, "unexpected {:?}", other),
                    }
                }
                Command::Text(id, text) => {
                    let outcome = world.step_command(id, &text);
                    if text.parse::<Direction>().is_err() {
                        prop_assert!(
                            matches!(outcome, Outcome::InvalidAction { .. }),
                            "expected InvalidAction, got {:?}",
                            outcome
                        );
                        prop_assert_eq!(world.positions(), &before);
                    }
                }
                Command::Reset => {
                    let restored = world.reset().clone();
                    prop_assert_eq!(&restored, world.start_positions());
                }
                Command::SetObstacle(at, on) => {
                    let accepted = world.set_obstacle(at, on).is_ok();
                    if on && starts.contains(&at) {
                        prop_assert!(!accepted);
                    }
                    if accepted {
                        if on {
                            obstacles.insert(at);
                        } else {
                            obstacles.remove(&at);
                        }
                    }
                    prop_assert_eq!(world.positions(), &before);
                }
                Command::SetCell { at, obstacle, keep_occupant } => {
                    let occupant = if keep_occupant {
                        world.cell_at(at).unwrap().occupant()
                    } else {
                        None
                    };
                    let cell = if obstacle { Cell::obstacle() } else { Cell::floor() };
                    let accepted = world.set_cell(at, cell.with_occupant(occupant)).is_ok();
                    if obstacle && starts.contains(&at) {
                        prop_assert!(!accepted);
                    }
                    if accepted {
                        if obstacle {
                            obstacles.insert(at);
                        } else {
                            obstacles.remove(&at);
                        }
                    }
                    prop_assert_eq!(world.positions(), &before);
                }
                Command::PlaceItem(at) => {
                    world.place_item(at, Item::target()).unwrap();
                    prop_assert!(world.cell_at(at).unwrap().has_items());
                }
                Command::TakeItem(at) => {
                    world.take_item(at).unwrap();
                }
                Command::PickUp(id) => {
                    prop_assert_eq!(world.pick_up(id).is_ok(), before.contains_key(&id));
                    prop_assert_eq!(world.positions(), &before);
                }
            }
            prop_assert!(world.check_invariants().is_ok(), "{:?}", world.check_invariants());
            prop_assert_eq!(obstacle_cells(&world), obstacles.clone());
        }

        // Whatever was mutated, a reset must land every occupant on a walkable cell.
        world.reset();
        prop_assert!(world.check_invariants().is_ok(), "{:?}", world.check_invariants());
    }

    #[test]
    fn reset_is_idempotent((mut world, script) in scenario()) {
        for command in script {
            match command {
                Command::Step(id, direction) => {
                    world.step(id, direction);
                }
                Command::SetObstacle(at, on) => {
                    let _ = world.set_obstacle(at, on);
                }
                _ => {}
            }
        }
        let first = world.reset().clone();
        let second = world.reset().clone();
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(&first, world.start_positions());
        prop_assert!(world.check_invariants().is_ok());
    }

    #[test]
    fn boundary_moves_never_leave_the_grid(
        rows in 1usize..12,
        cols in 1usize..12,
        directions in prop::collection::vec(direction(), 1..80),
    ) {
        let mut world = GridWorld::with_defaults(rows, cols).unwrap();
        for direction in directions {
            let before = world.position(0).unwrap();
            let outcome = world.step(0, direction);
            let after = world.position(0).unwrap();
            prop_assert!(after.row < rows && after.col < cols);
            if matches!(outcome, Outcome::NoOp { .. }) {
                prop_assert_eq!(before, after);
                prop_assert_eq!(direction.step_clamped(before, rows, cols), before);
            } else {
                prop_assert!(outcome.is_success());
            }
        }
    }
}
