use serde::{Deserialize, Serialize};

pub mod door_path;
pub mod frontier;
pub mod grid;
pub mod history;
pub mod keeper;
pub mod map;
pub mod maze;
pub mod simulation;

/// Represents a 2D coordinate as (row, column).
///
/// Rows grow downwards and columns grow to the right. Coordinates are signed so a
/// sparse map can describe cells on either side of the starting point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub row: i32,
    pub col: i32,
}

impl Position {
    pub const fn new(row: i32, col: i32) -> Self {
        Position { row, col }
    }

    /// Returns the neighbouring position one step in `direction`.
    #[inline]
    pub fn step(self, direction: Direction) -> Position {
        let (dr, dc) = direction.offset();
        Position {
            row: self.row + dr,
            col: self.col + dc,
        }
    }

    /// Returns the four neighbours in sensing order.
    pub fn neighbours(self) -> [Position; 4] {
        Direction::ALL.map(|direction| self.step(direction))
    }

    /// True when `other` shares an edge with `self`.
    #[inline]
    pub fn is_adjacent(self, other: Position) -> bool {
        self.row.abs_diff(other.row) + self.col.abs_diff(other.col) == 1
    }

    /// The direction leading from `self` to the adjacent `other`, if they are adjacent.
    pub fn direction_to(self, other: Position) -> Option<Direction> {
        Direction::ALL
            .into_iter()
            .find(|&direction| self.step(direction) == other)
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// One of the four grid directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Right,
    Down,
    Left,
}

impl Direction {
    /// Fixed sensing order. Later directions win ties between sighted keys.
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Right,
        Direction::Down,
        Direction::Left,
    ];

    /// Index of this direction within [`Direction::ALL`].
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// (row, column) delta of a single step.
    #[inline]
    pub fn offset(self) -> (i32, i32) {
        match self {
            Direction::Up => (-1, 0),
            Direction::Right => (0, 1),
            Direction::Down => (1, 0),
            Direction::Left => (0, -1),
        }
    }
}

/// What the keeper knows about a single grid cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cell {
    /// Never sensed.
    #[default]
    Unknown,
    Open,
    Wall,
    Key,
    Door,
}

impl Cell {
    /// Cells the keeper may step onto. Unknown cells are never entered.
    #[inline]
    pub fn is_passable(self) -> bool {
        matches!(self, Cell::Open | Cell::Key | Cell::Door)
    }
}

/// Represents the moves a keeper can return from a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    MoveUp,
    MoveRight,
    MoveDown,
    MoveLeft,
    /// Idle response once the keeper has nothing left to do.
    Wait,
}

impl Action {
    /// The direction this action moves in, `None` for [`Action::Wait`].
    pub fn direction(self) -> Option<Direction> {
        match self {
            Action::MoveUp => Some(Direction::Up),
            Action::MoveRight => Some(Direction::Right),
            Action::MoveDown => Some(Direction::Down),
            Action::MoveLeft => Some(Direction::Left),
            Action::Wait => None,
        }
    }
}

impl From<Direction> for Action {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Up => Action::MoveUp,
            Direction::Right => Action::MoveRight,
            Direction::Down => Action::MoveDown,
            Direction::Left => Action::MoveLeft,
        }
    }
}
