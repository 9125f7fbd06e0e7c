use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

use crate::{Direction, Position};

/// Represents errors that can occur within the grid operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GridError {
    #[error("Cell ({row}, {col}) is out of bounds for a {height}x{width} grid")]
    OutOfBounds {
        row: usize,
        col: usize,
        height: usize,
        width: usize,
    },
}

/// A generic 2D grid structure.
///
/// Stores elements of type `T` in a flat vector using row-major order.
/// Dimensions are fixed at construction; cells are addressed by [`Position`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid<T> {
    height: usize,
    width: usize,
    cells: Vec<T>,
}

/// A boolean occupancy layer over the board (a "curtain").
pub type Mask = Grid<bool>;

impl<T> Grid<T> {
    /// Creates a new grid with the specified dimensions, filled with default values.
    ///
    /// # Panics
    ///
    /// Panics if `height * width` overflows `usize`.
    pub fn new(height: usize, width: usize) -> Self
    where
        T: Default + Clone,
    {
        Self::filled(height, width, T::default())
    }

    /// Creates a new grid with every cell set to `value`.
    ///
    /// # Panics
    ///
    /// Panics if `height * width` overflows `usize`.
    pub fn filled(height: usize, width: usize, value: T) -> Self
    where
        T: Clone,
    {
        let size = height.checked_mul(width).expect("Grid size overflow");
        Grid {
            height,
            width,
            cells: vec![value; size],
        }
    }

    /// Creates a new grid with the specified dimensions, filled by a generator function.
    ///
    /// The generator function `f` receives each cell's position in row-major order.
    ///
    /// # Panics
    ///
    /// Panics if `height * width` overflows `usize`.
    pub fn from_generator<F>(height: usize, width: usize, mut f: F) -> Self
    where
        F: FnMut(Position) -> T,
    {
        let size = height.checked_mul(width).expect("Grid size overflow");
        let mut cells = Vec::with_capacity(size);
        for row in 0..height {
            for col in 0..width {
                cells.push(f(Position { row, col }));
            }
        }
        Grid {
            height,
            width,
            cells,
        }
    }

    /// Returns the number of rows.
    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the number of columns.
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Converts a position to a flat vector index.
    ///
    /// Returns `None` if the position is out of bounds.
    #[inline]
    pub fn index_of(&self, position: Position) -> Option<usize> {
        if self.contains(position) {
            Some(position.row * self.width + position.col)
        } else {
            None
        }
    }

    /// Checks if the given position lies on the grid.
    #[inline]
    pub fn contains(&self, position: Position) -> bool {
        position.row < self.height && position.col < self.width
    }

    /// The on-board neighbour of `position` one step in `direction`.
    #[inline]
    pub fn step(&self, position: Position, direction: Direction) -> Option<Position> {
        position
            .offset(direction)
            .filter(|target| self.contains(*target))
    }

    /// Gets an immutable reference to the cell at the given position.
    pub fn get(&self, position: Position) -> Option<&T> {
        let index = self.index_of(position)?;
        self.cells.get(index)
    }

    /// Sets the value of the cell at the given position.
    ///
    /// Returns `Err(GridError::OutOfBounds)` if the position is off the grid.
    pub fn set(&mut self, position: Position, value: T) -> Result<(), GridError> {
        let index = self.index_of(position).ok_or(GridError::OutOfBounds {
            row: position.row,
            col: position.col,
            height: self.height,
            width: self.width,
        })?;
        self.cells[index] = value;
        Ok(())
    }

    /// Returns an iterator over the cells of the grid in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.cells.iter()
    }

    /// Returns an iterator that yields `(Position, &T)` for each cell.
    pub fn enumerate(&self) -> impl Iterator<Item = (Position, &T)> {
        let width = self.width;
        self.cells.iter().enumerate().map(move |(index, cell)| {
            (
                Position {
                    row: index / width,
                    col: index % width,
                },
                cell,
            )
        })
    }

    /// Returns the cells of one row, or `None` past the last row.
    pub fn row(&self, row: usize) -> Option<&[T]> {
        if row < self.height {
            Some(&self.cells[row * self.width..(row + 1) * self.width])
        } else {
            None
        }
    }

    /// Returns a slice containing all cells in the grid.
    pub fn as_slice(&self) -> &[T] {
        &self.cells
    }

    /// A copy of the grid turned a quarter turn counter-clockwise.
    pub fn rotated_ccw(&self) -> Grid<T>
    where
        T: Clone,
    {
        // new[r][c] = old[c][width - 1 - r]
        let (height, width) = (self.width, self.height);
        Grid::from_generator(height, width, |p| {
            self[Position::new(p.col, self.width - 1 - p.row)].clone()
        })
    }
}

impl Mask {
    /// An all-clear mask.
    pub fn empty(height: usize, width: usize) -> Self {
        Grid::filled(height, width, false)
    }

    /// True if `position` is on the board and set.
    #[inline]
    pub fn is_set(&self, position: Position) -> bool {
        self.get(position).copied().unwrap_or(false)
    }

    /// Number of set cells.
    pub fn count(&self) -> usize {
        self.cells.iter().filter(|cell| **cell).count()
    }

    /// True if no cell is set.
    pub fn is_clear(&self) -> bool {
        !self.cells.iter().any(|cell| *cell)
    }

    /// Set cells in row-major order.
    pub fn positions(&self) -> Vec<Position> {
        self.enumerate()
            .filter(|(_, cell)| **cell)
            .map(|(position, _)| position)
            .collect()
    }

    /// Translates the whole mask one cell in `direction`.
    ///
    /// This is a rotation of the backing storage: whatever leaves one edge
    /// re-enters on the opposite edge, so callers must only shift a mask whose
    /// leading edge is clear.
    pub fn shift(&mut self, direction: Direction) {
        let width = self.width;
        if width == 0 || self.height == 0 {
            return;
        }
        match direction {
            Direction::North => self.cells.rotate_left(width),
            Direction::South => self.cells.rotate_right(width),
            Direction::West => self
                .cells
                .chunks_exact_mut(width)
                .for_each(|row| row.rotate_left(1)),
            Direction::East => self
                .cells
                .chunks_exact_mut(width)
                .for_each(|row| row.rotate_right(1)),
        }
    }
}

/// Allows indexing the grid by [`Position`] for immutable access.
impl<T> Index<Position> for Grid<T> {
    type Output = T;

    #[inline]
    fn index(&self, position: Position) -> &Self::Output {
        match self.index_of(position) {
            Some(idx) => &self.cells[idx],
            None => panic!(
                "Grid index ({}, {}) out of bounds for a {}x{} grid",
                position.row, position.col, self.height, self.width
            ),
        }
    }
}

/// Allows indexing the grid by [`Position`] for mutable access.
impl<T> IndexMut<Position> for Grid<T> {
    #[inline]
    fn index_mut(&mut self, position: Position) -> &mut Self::Output {
        let height = self.height;
        let width = self.width;
        match self.index_of(position) {
            Some(idx) => &mut self.cells[idx],
            None => panic!(
                "Grid index ({}, {}) out of bounds for a {}x{} grid",
                position.row, position.col, height, width
            ),
        }
    }
}
