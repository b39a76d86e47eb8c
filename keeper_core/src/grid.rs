use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

use crate::Position;

/// Extent of a bounded grid. Valid positions are `0..rows` x `0..cols`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Bounds {
    pub rows: usize,
    pub cols: usize,
}

impl Bounds {
    /// The classic fixed 40x40 keeper arena.
    pub const CLASSIC: Bounds = Bounds { rows: 40, cols: 40 };

    pub const fn new(rows: usize, cols: usize) -> Self {
        Bounds { rows, cols }
    }

    /// Checks if the given position lies inside the extent.
    #[inline]
    pub fn contains(&self, position: Position) -> bool {
        usize::try_from(position.row).is_ok_and(|row| row < self.rows)
            && usize::try_from(position.col).is_ok_and(|col| col < self.cols)
    }

    /// True for positions on the outermost ring of the extent.
    #[inline]
    pub fn is_border(&self, position: Position) -> bool {
        self.contains(position)
            && (position.row == 0
                || position.col == 0
                || position.row as usize == self.rows - 1
                || position.col as usize == self.cols - 1)
    }

    /// Iterates over every position on the outermost ring.
    pub fn border(&self) -> impl Iterator<Item = Position> + '_ {
        (0..self.rows).flat_map(move |row| {
            (0..self.cols).filter_map(move |col| {
                let position = Position::new(row as i32, col as i32);
                self.is_border(position).then_some(position)
            })
        })
    }
}

/// A dense, bounded 2D grid.
///
/// Stores elements of type `T` in a flat vector using row-major order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid<T> {
    bounds: Bounds,
    cells: Vec<T>,
}

impl<T> Grid<T> {
    /// Creates a new grid filled with default values.
    ///
    /// # Arguments
    ///
    /// * `rows`: Number of rows in the grid.
    /// * `cols`: Number of columns in the grid.
    ///
    /// # Panics
    ///
    /// Panics if `rows * cols` overflows `usize`.
    pub fn new(rows: usize, cols: usize) -> Self
    where
        T: Default + Clone,
    {
        let size = rows.checked_mul(cols).expect("Grid size overflow");
        Grid {
            bounds: Bounds::new(rows, cols),
            cells: vec![T::default(); size],
        }
    }

    /// Creates a new grid whose cells are produced by a generator function.
    ///
    /// # Arguments
    ///
    /// * `rows`: Number of rows in the grid.
    /// * `cols`: Number of columns in the grid.
    /// * `f`: A function `FnMut(Position) -> T`, called once per cell in row-major order.
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
                cells.push(f(Position::new(row as i32, col as i32)));
            }
        }
        Grid {
            bounds: Bounds::new(rows, cols),
            cells,
        }
    }

    #[inline]
    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.bounds.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.bounds.cols
    }

    /// Converts a position to a flat vector index, `None` when out of bounds.
    #[inline]
    fn index_of(&self, position: Position) -> Option<usize> {
        self.bounds
            .contains(position)
            .then(|| position.row as usize * self.bounds.cols + position.col as usize)
    }

    /// Gets an immutable reference to the element at `position`, `None` when out of bounds.
    pub fn get(&self, position: Position) -> Option<&T> {
        self.index_of(position).map(|index| &self.cells[index])
    }

    /// Returns an iterator that yields `(position, &T)` in row-major order.
    pub fn enumerate(&self) -> impl Iterator<Item = (Position, &T)> {
        let cols = self.bounds.cols;
        self.cells.iter().enumerate().map(move |(index, cell)| {
            (
                Position::new((index / cols) as i32, (index % cols) as i32),
                cell,
            )
        })
    }
}

impl<T> Index<Position> for Grid<T> {
    type Output = T;

    #[inline]
    fn index(&self, position: Position) -> &Self::Output {
        match self.index_of(position) {
            Some(index) => &self.cells[index],
            None => panic!(
                "Grid index {} out of bounds for grid size ({}, {})",
                position, self.bounds.rows, self.bounds.cols
            ),
        }
    }
}

impl<T> IndexMut<Position> for Grid<T> {
    #[inline]
    fn index_mut(&mut self, position: Position) -> &mut Self::Output {
        let bounds = self.bounds;
        match self.index_of(position) {
            Some(index) => &mut self.cells[index],
            None => panic!(
                "Grid index {} out of bounds for grid size ({}, {})",
                position, bounds.rows, bounds.cols
            ),
        }
    }
}
