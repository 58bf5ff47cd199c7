use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

use crate::Position;

/// Represents errors that can occur within the grid operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GridError {
    #[error("Coordinates ({row}, {col}) are out of bounds for grid size ({rows}, {cols})")]
    OutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },
}

/// A generic 2D grid structure.
///
/// Stores elements of type `T` in a flat vector using row-major order.
/// Provides methods for accessing and modifying elements via `(row, col)` coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid<T> {
    rows: usize,
    cols: usize,
    cells: Vec<T>,
}

impl<T> Grid<T> {
    /// Creates a new grid with the specified dimensions, filled with default values.
    ///
    /// # Panics
    ///
    /// Panics if `rows * cols` overflows `usize`.
    pub fn new(rows: usize, cols: usize) -> Self
    where
        T: Default,
    {
        Self::from_generator(rows, cols, |_| T::default())
    }

    /// Creates a new grid with the specified dimensions, filled by a generator function.
    ///
    /// The generator is called once per cell in row-major order.
    ///
    /// # Panics
    ///
    /// Panics if `rows * cols` overflows `usize`.
    pub fn from_generator<F>(rows: usize, cols: usize, mut f: F) -> Self
    where
        F: FnMut(Position) -> T,
    {
        let size = rows.checked_mul(cols).expect("Grid size overflow");
        let mut cells = Vec::with_capacity(size);
        for row in 0..rows {
            for col in 0..cols {
                cells.push(f(Position { row, col }));
            }
        }
        Grid { rows, cols, cells }
    }

    /// Returns the number of rows.
    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Returns the number of columns.
    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    fn to_index(&self, pos: Position) -> Option<usize> {
        if self.contains(pos) {
            Some(pos.row * self.cols + pos.col)
        } else {
            None
        }
    }

    #[inline]
    fn to_position(&self, index: usize) -> Position {
        Position {
            row: index / self.cols,
            col: index % self.cols,
        }
    }

    fn out_of_bounds(&self, pos: Position) -> GridError {
        GridError::OutOfBounds {
            row: pos.row,
            col: pos.col,
            rows: self.rows,
            cols: self.cols,
        }
    }

    /// Checks if the given coordinates are within the grid boundaries.
    #[inline]
    pub fn contains(&self, pos: Position) -> bool {
        pos.row < self.rows && pos.col < self.cols
    }

    /// Returns `Ok(())` when `pos` is in bounds, the matching `OutOfBounds` error otherwise.
    pub fn check(&self, pos: Position) -> Result<(), GridError> {
        if self.contains(pos) {
            Ok(())
        } else {
            Err(self.out_of_bounds(pos))
        }
    }

    /// Gets an immutable reference to the cell at the given coordinates.
    pub fn get(&self, pos: Position) -> Result<&T, GridError> {
        match self.to_index(pos) {
            Some(index) => Ok(&self.cells[index]),
            None => Err(self.out_of_bounds(pos)),
        }
    }

    /// Gets a mutable reference to the cell at the given coordinates.
    pub fn get_mut(&mut self, pos: Position) -> Result<&mut T, GridError> {
        match self.to_index(pos) {
            Some(index) => Ok(&mut self.cells[index]),
            None => Err(self.out_of_bounds(pos)),
        }
    }

    /// Replaces the cell at the given coordinates, returning the previous value.
    pub fn set(&mut self, pos: Position, value: T) -> Result<T, GridError> {
        let slot = self.get_mut(pos)?;
        Ok(std::mem::replace(slot, value))
    }

    /// Returns an iterator over the cells of the grid in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.cells.iter()
    }

    /// Returns a mutable iterator over the cells of the grid in row-major order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.cells.iter_mut()
    }

    /// Returns an iterator that yields `(Position, &T)` for each cell.
    pub fn enumerate(&self) -> impl Iterator<Item = (Position, &T)> {
        self.cells
            .iter()
            .enumerate()
            .map(move |(index, cell)| (self.to_position(index), cell))
    }

    /// Returns a slice of one row, or `None` if `row` is out of range.
    pub fn row(&self, row: usize) -> Option<&[T]> {
        if row < self.rows {
            let start = row * self.cols;
            Some(&self.cells[start..start + self.cols])
        } else {
            None
        }
    }
}

/// Indexing using Position coordinates. Panics when out of bounds.
impl<T> Index<Position> for Grid<T> {
    type Output = T;

    #[inline]
    fn index(&self, pos: Position) -> &Self::Output {
        match self.to_index(pos) {
            Some(idx) => &self.cells[idx],
            None => panic!("{}", self.out_of_bounds(pos)),
        }
    }
}

/// Indexing using Position coordinates for mutable access. Panics when out of bounds.
impl<T> IndexMut<Position> for Grid<T> {
    #[inline]
    fn index_mut(&mut self, pos: Position) -> &mut Self::Output {
        match self.to_index(pos) {
            Some(idx) => &mut self.cells[idx],
            None => panic!("{}", self.out_of_bounds(pos)),
        }
    }
}
