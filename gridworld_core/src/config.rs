use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    Item, OccupantId, Position, Rgb,
    world::{GridWorld, WorldError},
};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to parse world config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid world config: {0}")]
    World(#[from] WorldError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccupantSpec {
    pub id: OccupantId,
    pub row: usize,
    pub col: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemSpec {
    pub row: usize,
    pub col: usize,
    pub category: String,
    pub color: Rgb,
    pub shape: String,
}

/// Construction-time description of a world, loadable from TOML.
///
/// ```toml
/// rows = 5
/// cols = 5
/// obstacles = [{ row = 0, col = 1 }]
///
/// [[occupants]]
/// id = 0
/// row = 0
/// col = 0
///
/// [[items]]
/// row = 4
/// col = 4
/// category = "target"
/// color = [0, 0, 100]
/// shape = "circle"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub rows: usize,
    pub cols: usize,
    pub occupants: Vec<OccupantSpec>,
    pub obstacles: Vec<Position>,
    pub items: Vec<ItemSpec>,
}

impl Default for WorldConfig {
    fn default() -> Self {
        WorldConfig {
            rows: 10,
            cols: 10,
            occupants: vec![OccupantSpec {
                id: 0,
                row: 0,
                col: 0,
            }],
            obstacles: Vec::new(),
            items: Vec::new(),
        }
    }
}

impl WorldConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    pub fn build(&self) -> Result<GridWorld, WorldError> {
        // Group items per cell, keeping file order within a cell.
        let mut items: BTreeMap<Position, Vec<Item>> = BTreeMap::new();
        for spec in &self.items {
            items
                .entry(Position::new(spec.row, spec.col))
                .or_default()
                .push(Item::new(spec.category.clone(), spec.color, spec.shape.clone()));
        }

        GridWorld::new(
            self.rows,
            self.cols,
            self.occupants
                .iter()
                .map(|o| (o.id, Position::new(o.row, o.col))),
            self.obstacles.iter().copied(),
            items,
        )
    }
}

impl GridWorld {
    pub fn from_config(config: &WorldConfig) -> Result<Self, WorldError> {
        config.build()
    }
}

/// Loads a world from a text map.
///
/// One line per row, whitespace-separated tokens, listed from the top row
/// (highest index) down so that north points up:
///
/// * `.` floor
/// * `#` obstacle
/// * `@N` occupant `N`
/// * `T` target item on floor
pub fn load_world_from_str(map_string: &str) -> Result<GridWorld, MapError> {
    let lines: Vec<&str> = map_string
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    if lines.is_empty() {
        return Err(MapError::Empty);
    }

    let rows = lines.len();
    let mut cols = 0;
    let mut occupants: Vec<(OccupantId, Position)> = Vec::new();
    let mut obstacles = Vec::new();
    let mut items = Vec::new();

    for (line_no, line) in lines.iter().enumerate() {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if line_no == 0 {
            cols = tokens.len();
        } else if tokens.len() != cols {
            return Err(MapError::RaggedRow {
                line: line_no + 1,
                expected: cols,
                found: tokens.len(),
            });
        }

        let row = rows - 1 - line_no;
        for (col, token) in tokens.iter().enumerate() {
            let pos = Position::new(row, col);
            match *token {
                "." => {}
                "#" => obstacles.push(pos),
                "T" => items.push((pos, vec![Item::target()])),
                other => {
                    let id = other
                        .strip_prefix('@')
                        .and_then(|digits| digits.parse::<OccupantId>().ok())
                        .ok_or_else(|| MapError::UnknownToken {
                            token: other.to_string(),
                            line: line_no + 1,
                            col,
                        })?;
                    occupants.push((id, pos));
                }
            }
        }
    }

    Ok(GridWorld::new(rows, cols, occupants, obstacles, items)?)
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MapError {
    #[error("Map string is empty.")]
    Empty,
    #[error("Inconsistent width at line {line}: expected {expected}, found {found}")]
    RaggedRow {
        line: usize,
        expected: usize,
        found: usize,
    },
    #[error("Unknown map token '{token}' at line {line}, column {col}")]
    UnknownToken {
        token: String,
        line: usize,
        col: usize,
    },
    #[error(transparent)]
    World(#[from] WorldError),
}
