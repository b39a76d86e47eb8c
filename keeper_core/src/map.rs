use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{Cell, Position, grid::Bounds};

/// Represents errors that can occur while recording sensed cells.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MapError {
    #[error("Position {position} is out of bounds for map size ({rows}, {cols})")]
    OutOfBounds {
        position: Position,
        rows: usize,
        cols: usize,
    },
}

/// The keeper's incrementally built picture of the maze.
///
/// Cells are stored sparsely, so an unbounded map grows with whatever the keeper
/// senses. When the extent of the maze is known up front its outer ring is
/// recorded as [`Cell::Wall`] before any sensing and writes beyond it are rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridMap {
    bounds: Option<Bounds>,
    cells: HashMap<Position, Cell>,
}

impl GridMap {
    /// Creates an empty map with no known extent.
    pub fn unbounded() -> Self {
        GridMap::default()
    }

    /// Creates a map of fixed extent with its border pre-marked as wall.
    pub fn bounded(bounds: Bounds) -> Self {
        let cells = bounds.border().map(|position| (position, Cell::Wall)).collect();
        GridMap {
            bounds: Some(bounds),
            cells,
        }
    }

    /// Classification of `position`, [`Cell::Unknown`] if it was never sensed.
    #[inline]
    pub fn classify(&self, position: Position) -> Cell {
        self.cells.get(&position).copied().unwrap_or_default()
    }

    /// Records a sensed classification, overwriting whatever was known before.
    ///
    /// # Arguments
    ///
    /// * `position`: The sensed cell.
    /// * `cell`: Its classification.
    ///
    /// # Errors
    ///
    /// Returns `MapError::OutOfBounds` if the map is bounded and `position` lies outside it.
    pub fn record(&mut self, position: Position, cell: Cell) -> Result<(), MapError> {
        if let Some(bounds) = self.bounds {
            if !bounds.contains(position) {
                return Err(MapError::OutOfBounds {
                    position,
                    rows: bounds.rows,
                    cols: bounds.cols,
                });
            }
        }
        self.cells.insert(position, cell);
        Ok(())
    }

    /// Number of cells with a known classification.
    pub fn known(&self) -> usize {
        self.cells.len()
    }
}
