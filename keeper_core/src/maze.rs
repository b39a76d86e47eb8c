use std::{fmt, str::FromStr};

use rand::{Rng, SeedableRng, rngs::StdRng, seq::SliceRandom};
use serde::{Deserialize, Serialize};

use crate::{
    Action, Cell, Direction, Position,
    grid::{Bounds, Grid},
    keeper::Senses,
};

/// Represents the static contents of a maze cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tile {
    #[default]
    Floor,
    Wall,
    Key,
    /// The exit. Walkable; reaching it with every key ends the attempt.
    Door,
}

impl Tile {
    fn glyph(self) -> char {
        match self {
            Tile::Floor => '.',
            Tile::Wall => '#',
            Tile::Key => 'K',
            Tile::Door => 'D',
        }
    }
}

impl From<Tile> for Cell {
    fn from(tile: Tile) -> Self {
        match tile {
            Tile::Floor => Cell::Open,
            Tile::Wall => Cell::Wall,
            Tile::Key => Cell::Key,
            Tile::Door => Cell::Door,
        }
    }
}

/// Represents the outcome of applying a keeper's action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionResult {
    Success,
    Failure(String),
    /// The keeper stands on the door holding every key.
    Escaped,
}

/// Errors raised while loading or generating a maze.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MazeError {
    #[error("Maze text is empty")]
    Empty,
    #[error("Inconsistent width at row {row}: expected {expected}, found {found}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("Unknown maze glyph '{glyph}' at {position}")]
    UnknownGlyph { glyph: char, position: Position },
    #[error("No start position ('S') found in maze")]
    MissingStart,
    #[error("Multiple start positions ('S') found")]
    DuplicateStart,
    #[error("No door ('D') found in maze")]
    MissingDoor,
    #[error("Multiple doors ('D') found")]
    DuplicateDoor,
    #[error("Border cell {position} is not a wall")]
    OpenBorder { position: Position },
    #[error("Cannot generate a {rows}x{cols} maze holding {keys} keys")]
    InvalidParameters { rows: usize, cols: usize, keys: usize },
}

/// A closed maze with one door, some keys and a keeper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Maze {
    tiles: Grid<Tile>,
    keeper: Position,
    door: Position,
    keys_held: usize,
    total_keys: usize,
}

impl Maze {
    pub fn tiles(&self) -> &Grid<Tile> {
        &self.tiles
    }

    pub fn bounds(&self) -> Bounds {
        self.tiles.bounds()
    }

    pub fn keeper(&self) -> Position {
        self.keeper
    }

    pub fn door(&self) -> Position {
        self.door
    }

    /// True once the keeper stands on the door holding every key.
    pub fn is_escaped(&self) -> bool {
        self.keeper == self.door && self.keys_held == self.total_keys
    }

    /// Moves the keeper one cell, collecting keys on the way.
    pub fn apply(&mut self, action: Action) -> ActionResult {
        let Some(direction) = action.direction() else {
            return ActionResult::Success;
        };
        let target = self.keeper.step(direction);
        match self.tiles.get(target).copied() {
            None => ActionResult::Failure(format!("Target {} is out of bounds.", target)),
            Some(Tile::Wall) => {
                ActionResult::Failure(format!("Cannot move into the wall at {}.", target))
            }
            Some(tile) => {
                if tile == Tile::Key {
                    self.keys_held += 1;
                    self.tiles[target] = Tile::Floor;
                }
                self.keeper = target;
                if self.is_escaped() {
                    ActionResult::Escaped
                } else {
                    ActionResult::Success
                }
            }
        }
    }

    /// Generates a perfect maze of `rows` x `cols` rooms using a recursive backtracker.
    ///
    /// The tile grid is `(2 * rows + 1) x (2 * cols + 1)`. Start, door and keys are
    /// placed on distinct floor tiles; keys are kept more than two steps apart so a
    /// keeper never has two of them in sight at once.
    ///
    /// # Arguments
    ///
    /// * `rows`, `cols`: Number of rooms in each direction.
    /// * `keys`: Number of keys to hide.
    /// * `seed`: Seed for `StdRng`; the same seed always yields the same maze.
    ///
    /// # Errors
    ///
    /// Returns `MazeError::InvalidParameters` if there are no rooms or not enough room for the keys.
    pub fn generate(
        rows: usize,
        cols: usize,
        keys: usize,
        seed: u64,
    ) -> Result<Maze, MazeError> {
        let invalid = MazeError::InvalidParameters { rows, cols, keys };
        if rows == 0 || cols == 0 {
            return Err(invalid);
        }
        let mut rng = StdRng::seed_from_u64(seed);
        let mut tiles: Grid<Tile> =
            Grid::from_generator(2 * rows + 1, 2 * cols + 1, |_| Tile::Wall);
        let room =
            |row: usize, col: usize| Position::new(2 * row as i32 + 1, 2 * col as i32 + 1);

        let mut carved = Grid::<bool>::new(rows, cols);
        let mut stack = vec![(0usize, 0usize)];
        carved[Position::new(0, 0)] = true;
        tiles[room(0, 0)] = Tile::Floor;

        while let Some(&(row, col)) = stack.last() {
            let options: Vec<(usize, usize)> = Direction::ALL
                .into_iter()
                .filter_map(|direction| {
                    let next = Position::new(row as i32, col as i32).step(direction);
                    (carved.get(next) == Some(&false))
                        .then_some((next.row as usize, next.col as usize))
                })
                .collect();
            if options.is_empty() {
                stack.pop();
                continue;
            }
            let (next_row, next_col) = options[rng.random_range(0..options.len())];
            let (from, to) = (room(row, col), room(next_row, next_col));
            let between = Position::new((from.row + to.row) / 2, (from.col + to.col) / 2);
            tiles[between] = Tile::Floor;
            tiles[to] = Tile::Floor;
            carved[Position::new(next_row as i32, next_col as i32)] = true;
            stack.push((next_row, next_col));
        }

        let mut floor: Vec<Position> = tiles
            .enumerate()
            .filter(|(_, tile)| **tile == Tile::Floor)
            .map(|(position, _)| position)
            .collect();
        floor.shuffle(&mut rng);

        let mut spots = floor.into_iter();
        let (Some(keeper), Some(door)) = (spots.next(), spots.next()) else {
            return Err(invalid);
        };
        tiles[door] = Tile::Door;

        let mut placed: Vec<Position> = Vec::with_capacity(keys);
        for spot in spots {
            if placed.len() == keys {
                break;
            }
            let spaced = placed
                .iter()
                .all(|key| key.row.abs_diff(spot.row) + key.col.abs_diff(spot.col) > 2);
            if spaced {
                placed.push(spot);
            }
        }
        if placed.len() < keys {
            return Err(invalid);
        }
        for key in &placed {
            tiles[*key] = Tile::Key;
        }

        Ok(Maze {
            tiles,
            keeper,
            door,
            keys_held: 0,
            total_keys: keys,
        })
    }

    /// Renders the maze with the keeper as `S`, in the format [`load_maze_from_string`] reads.
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(self.tiles.rows() * (self.tiles.cols() + 1));
        for (position, tile) in self.tiles.enumerate() {
            if position.col == 0 && position.row > 0 {
                out.push('\n');
            }
            out.push(if position == self.keeper && *tile != Tile::Door {
                'S'
            } else {
                tile.glyph()
            });
        }
        out
    }
}

impl Senses for Maze {
    fn keeper_position(&self) -> Position {
        self.keeper
    }

    fn look(&self, direction: Direction) -> Cell {
        self.tiles
            .get(self.keeper.step(direction))
            .map_or(Cell::Wall, |tile| Cell::from(*tile))
    }

    fn keys_held(&self) -> usize {
        self.keys_held
    }

    fn total_keys(&self) -> usize {
        self.total_keys
    }
}

impl FromStr for Maze {
    type Err = MazeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        load_maze_from_string(s)
    }
}

impl fmt::Display for Maze {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Loads a maze from its text form.
///
/// One glyph per cell: `#` wall, `.` or space floor, `K` key, `D` door and `S`
/// the keeper's start. Blank lines are ignored. The border must be all wall.
pub fn load_maze_from_string(text: &str) -> Result<Maze, MazeError> {
    let lines: Vec<Vec<char>> = text
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.chars().collect())
        .collect();
    let Some(first) = lines.first() else {
        return Err(MazeError::Empty);
    };

    let width = first.len();
    for (row, line) in lines.iter().enumerate() {
        if line.len() != width {
            return Err(MazeError::RaggedRow {
                row,
                expected: width,
                found: line.len(),
            });
        }
    }

    let mut tiles: Grid<Tile> = Grid::new(lines.len(), width);
    let mut keeper = None;
    let mut door = None;
    let mut total_keys = 0;

    for (row, line) in lines.iter().enumerate() {
        for (col, &glyph) in line.iter().enumerate() {
            let position = Position::new(row as i32, col as i32);
            tiles[position] = match glyph {
                '#' => Tile::Wall,
                '.' | ' ' => Tile::Floor,
                'K' => {
                    total_keys += 1;
                    Tile::Key
                }
                'D' => {
                    if door.replace(position).is_some() {
                        return Err(MazeError::DuplicateDoor);
                    }
                    Tile::Door
                }
                'S' => {
                    if keeper.replace(position).is_some() {
                        return Err(MazeError::DuplicateStart);
                    }
                    Tile::Floor
                }
                other => {
                    return Err(MazeError::UnknownGlyph {
                        glyph: other,
                        position,
                    });
                }
            };
        }
    }

    if let Some((position, _)) = tiles
        .enumerate()
        .find(|(position, tile)| tiles.bounds().is_border(*position) && **tile != Tile::Wall)
    {
        return Err(MazeError::OpenBorder { position });
    }

    Ok(Maze {
        tiles,
        keeper: keeper.ok_or(MazeError::MissingStart)?,
        door: door.ok_or(MazeError::MissingDoor)?,
        keys_held: 0,
        total_keys,
    })
}
