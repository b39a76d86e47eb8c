use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    Action, Cell, Direction, Position,
    door_path::DoorPath,
    frontier::Frontier,
    grid::Bounds,
    history::TravelHistory,
    map::{GridMap, MapError},
};

/// Local sensing the maze offers the keeper once per turn.
pub trait Senses {
    /// Where the keeper currently stands.
    fn keeper_position(&self) -> Position;

    /// Classification of the cell adjacent to the keeper in `direction`.
    fn look(&self, direction: Direction) -> Cell;

    fn keys_held(&self) -> usize;

    fn total_keys(&self) -> usize;
}

/// Snapshot of everything the keeper can sense on a single turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    pub position: Position,
    /// Adjacent cells indexed by [`Direction::index`].
    pub sight: [Cell; 4],
    pub keys_held: usize,
    pub total_keys: usize,
}

impl Observation {
    /// Samples `senses`, looking up, right, down and left in that order.
    pub fn sense<S: Senses + ?Sized>(senses: &S) -> Self {
        Observation {
            position: senses.keeper_position(),
            sight: Direction::ALL.map(|direction| senses.look(direction)),
            keys_held: senses.keys_held(),
            total_keys: senses.total_keys(),
        }
    }

    #[inline]
    pub fn sight(&self, direction: Direction) -> Cell {
        self.sight[direction.index()]
    }

    #[inline]
    pub fn all_keys_held(&self) -> bool {
        self.keys_held == self.total_keys
    }
}

/// Invariant violations detected while deciding a move.
///
/// None of these can happen inside a closed maze; each one means the maze broke
/// that assumption or the keeper's bookkeeping went out of sync.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeeperError {
    #[error("Turn {turn}: nothing left to explore from {position}")]
    EmptyFrontier { turn: usize, position: Position },
    #[error("No recorded step adjacent to {position} after travel index {from_index}")]
    BacktrackFailed {
        position: Position,
        from_index: usize,
    },
    #[error("Cannot step from {from} to non-adjacent {to}")]
    NotAdjacent { from: Position, to: Position },
    #[error(transparent)]
    Map(#[from] MapError),
}

/// Trait defining the behavior of a maze keeper.
pub trait Keeper {
    /// Decides the move for this turn. Called exactly once per game tick.
    fn act(&mut self, observation: &Observation) -> Result<Action, KeeperError>;
}

/// Keeper configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeeperConfig {
    /// Known extent of the maze. `None` keeps the map sparse and unbounded.
    pub bounds: Option<Bounds>,
}

impl KeeperConfig {
    pub fn bounded(rows: usize, cols: usize) -> Self {
        KeeperConfig {
            bounds: Some(Bounds::new(rows, cols)),
        }
    }

    /// Assumes the classic 40x40 arena anchored at the origin.
    pub fn classic() -> Self {
        KeeperConfig {
            bounds: Some(Bounds::CLASSIC),
        }
    }
}

/// Which branch of the control loop the explorer is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// Depth-first exploration, recording the door path once the door is known.
    Exploring,
    /// Every key is held; replaying the door path.
    Returning,
    /// The door path is used up. Every further turn is a [`Action::Wait`].
    Arrived,
}

/// Depth-first maze explorer.
///
/// Builds its map from local sensing, explores unvisited cells in stack order,
/// backtracks along its own travel history, grabs any key it sees and walks the
/// recorded door path home once every key is held.
#[derive(Debug, Clone)]
pub struct Explorer {
    map: GridMap,
    visited: HashSet<Position>,
    travel: TravelHistory,
    frontier: Frontier,
    door: Option<Position>,
    door_path: DoorPath,
    phase: Phase,
}

impl Default for Explorer {
    fn default() -> Self {
        Explorer::new(KeeperConfig::default())
    }
}

impl Explorer {
    pub fn new(config: KeeperConfig) -> Self {
        let map = match config.bounds {
            Some(bounds) => GridMap::bounded(bounds),
            None => GridMap::unbounded(),
        };
        Explorer {
            map,
            visited: HashSet::new(),
            travel: TravelHistory::new(),
            frontier: Frontier::new(),
            door: None,
            door_path: DoorPath::new(),
            phase: Phase::Exploring,
        }
    }

    pub fn map(&self) -> &GridMap {
        &self.map
    }

    pub fn visited(&self) -> &HashSet<Position> {
        &self.visited
    }

    pub fn travel(&self) -> &TravelHistory {
        &self.travel
    }

    pub fn frontier(&self) -> &Frontier {
        &self.frontier
    }

    /// Position of the door, once sighted.
    pub fn door(&self) -> Option<Position> {
        self.door
    }

    pub fn door_found(&self) -> bool {
        self.door.is_some()
    }

    pub fn door_path(&self) -> &DoorPath {
        &self.door_path
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Pops the next door path entry and steps towards it.
    fn return_to_door(&mut self, here: Position) -> Result<Action, KeeperError> {
        if self.phase == Phase::Exploring {
            info!(%here, route = self.door_path.len(), "all keys held, returning to the door");
            self.phase = Phase::Returning;
        }
        // The route may still end on the current cell when the door was only just sighted.
        while let Some(next) = self.door_path.next_step() {
            if next != here {
                return step(here, next);
            }
        }
        info!(%here, "door path consumed");
        self.phase = Phase::Arrived;
        Ok(Action::Wait)
    }

    /// Records the four sensed neighbours. Returns the direction of the last key seen.
    fn absorb(
        &mut self,
        observation: &Observation,
        turn: usize,
    ) -> Result<Option<Direction>, KeeperError> {
        let here = observation.position;
        let mut key_direction = None;
        for direction in Direction::ALL {
            let neighbour = here.step(direction);
            let cell = observation.sight(direction);
            self.map.record(neighbour, cell)?;

            if cell.is_passable() && !self.visited.contains(&neighbour) {
                self.frontier.offer(neighbour, turn);
            }
            match cell {
                Cell::Door if self.door.is_none() => {
                    info!(turn, door = %neighbour, "door sighted");
                    self.door = Some(neighbour);
                    self.door_path.seed(neighbour, here);
                }
                Cell::Key => key_direction = Some(direction),
                _ => {}
            }
        }
        Ok(key_direction)
    }

    /// Steps into the frontier top when adjacent, otherwise backtracks towards it.
    ///
    /// A frontier exhausted by pruning is only legal once every key is held and the
    /// door is known, in which case the return starts right away.
    fn advance(
        &mut self,
        here: Position,
        turn: usize,
        all_keys_held: bool,
    ) -> Result<Action, KeeperError> {
        let Some(top) = self.frontier.peek() else {
            if all_keys_held && self.door.is_some() {
                return self.return_to_door(here);
            }
            return Err(KeeperError::EmptyFrontier {
                turn,
                position: here,
            });
        };

        if top.position.is_adjacent(here) {
            self.frontier.pop();
            debug!(turn, %here, target = %top.position, "advancing");
            return step(here, top.position);
        }

        let target = self
            .travel
            .backtrack_from(top.travel_index, here)
            .ok_or(KeeperError::BacktrackFailed {
                position: here,
                from_index: top.travel_index,
            })?;
        debug!(turn, %here, %target, toward = %top.position, "backtracking");
        step(here, target)
    }
}

impl Keeper for Explorer {
    fn act(&mut self, observation: &Observation) -> Result<Action, KeeperError> {
        let here = observation.position;
        let turn = self.travel.append(here);
        self.visited.insert(here);
        self.frontier.remove(here);

        if self.phase == Phase::Arrived {
            warn!(turn, %here, "act called after the door path was consumed");
            return Ok(Action::Wait);
        }

        if self.phase == Phase::Returning
            || (self.door.is_some() && observation.all_keys_held())
        {
            return self.return_to_door(here);
        }

        if self.door.is_some() {
            self.door_path.record(here);
        }

        if let Some(direction) = self.absorb(observation, turn)? {
            debug!(turn, %here, ?direction, "key in sight");
            return Ok(direction.into());
        }

        // Pruned cells count as visited straight away so chains of dead ends collapse.
        let (map, visited) = (&self.map, &mut self.visited);
        let pruned = self.frontier.prune_dead_ends(|position| {
            let dead = no_exit(map, visited, position);
            if dead {
                visited.insert(position);
            }
            dead
        });
        if !pruned.is_empty() {
            debug!(turn, count = pruned.len(), "pruned dead ends");
        }

        self.advance(here, turn, observation.all_keys_held())
    }
}

/// True when every neighbour of `position` is a known wall or already visited.
fn no_exit(map: &GridMap, visited: &HashSet<Position>, position: Position) -> bool {
    position
        .neighbours()
        .iter()
        .all(|neighbour| map.classify(*neighbour) == Cell::Wall || visited.contains(neighbour))
}

/// Converts a move between two adjacent positions into an Action.
fn step(from: Position, to: Position) -> Result<Action, KeeperError> {
    from.direction_to(to)
        .map(Action::from)
        .ok_or(KeeperError::NotAdjacent { from, to })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(row: i32, col: i32) -> Position {
        Position::new(row, col)
    }

    fn observe(position: Position, sight: [Cell; 4]) -> Observation {
        Observation {
            position,
            sight,
            keys_held: 0,
            total_keys: 1,
        }
    }

    #[test]
    fn step_rejects_non_adjacent_targets() {
        assert_eq!(step(p(2, 2), p(1, 2)), Ok(Action::MoveUp));
        assert_eq!(step(p(2, 2), p(2, 1)), Ok(Action::MoveLeft));
        assert_eq!(
            step(p(2, 2), p(4, 2)),
            Err(KeeperError::NotAdjacent {
                from: p(2, 2),
                to: p(4, 2)
            })
        );
    }

    #[test]
    fn walls_and_unknown_cells_never_enter_the_frontier() {
        let mut explorer = Explorer::default();
        let action = explorer
            .act(&observe(p(1, 1), [Cell::Wall, Cell::Open, Cell::Wall, Cell::Unknown]))
            .unwrap();
        assert_eq!(action, Action::MoveRight);
        assert!(explorer.frontier().is_empty());
        assert_eq!(explorer.map().classify(p(0, 1)), Cell::Wall);
        assert_eq!(explorer.map().classify(p(1, 2)), Cell::Open);
    }

    #[test]
    fn enclosed_start_reports_empty_frontier() {
        let mut explorer = Explorer::default();
        let err = explorer
            .act(&observe(p(1, 1), [Cell::Wall; 4]))
            .unwrap_err();
        assert_eq!(
            err,
            KeeperError::EmptyFrontier {
                turn: 0,
                position: p(1, 1)
            }
        );
    }

    #[test]
    fn bounded_map_surfaces_sensing_beyond_the_extent() {
        let mut explorer = Explorer::new(KeeperConfig::bounded(3, 3));
        let err = explorer
            .act(&observe(p(0, 0), [Cell::Wall; 4]))
            .unwrap_err();
        assert!(matches!(err, KeeperError::Map(MapError::OutOfBounds { .. })));
    }

    #[test]
    fn backtrack_without_adjacent_travel_entry_is_reported() {
        let mut explorer = Explorer::default();
        explorer
            .act(&observe(p(1, 1), [Cell::Wall, Cell::Open, Cell::Open, Cell::Wall]))
            .unwrap();

        // Teleported somewhere that touches nothing the keeper has walked.
        let err = explorer
            .act(&observe(p(9, 9), [Cell::Wall; 4]))
            .unwrap_err();
        assert_eq!(
            err,
            KeeperError::BacktrackFailed {
                position: p(9, 9),
                from_index: 0
            }
        );
        assert_eq!(
            err.to_string(),
            "No recorded step adjacent to (9, 9) after travel index 0"
        );
    }

    #[test]
    fn no_exit_treats_unknown_as_open() {
        let mut map = GridMap::unbounded();
        let mut visited = HashSet::new();
        let pocket = p(5, 5);
        map.record(p(4, 5), Cell::Wall).unwrap();
        map.record(p(5, 6), Cell::Wall).unwrap();
        visited.insert(p(6, 5));
        assert!(!no_exit(&map, &visited, pocket));
        map.record(p(5, 4), Cell::Wall).unwrap();
        assert!(no_exit(&map, &visited, pocket));
    }

    #[test]
    fn arrived_keeper_waits() {
        let mut explorer = Explorer::default();
        let mut observation = observe(p(1, 1), [Cell::Door, Cell::Wall, Cell::Wall, Cell::Wall]);
        observation.total_keys = 0;

        // Turn 0 sights the door and steps into it.
        assert_eq!(explorer.act(&observation).unwrap(), Action::MoveUp);
        assert!(explorer.door_found());

        // The engine did not end the attempt; the route home is [door, (1, 1)].
        observation.position = p(0, 1);
        observation.sight = [Cell::Wall, Cell::Wall, Cell::Open, Cell::Wall];
        assert_eq!(explorer.act(&observation).unwrap(), Action::MoveDown);
        assert_eq!(explorer.phase(), Phase::Returning);

        observation.position = p(1, 1);
        assert_eq!(explorer.act(&observation).unwrap(), Action::MoveUp);
        observation.position = p(0, 1);
        assert_eq!(explorer.act(&observation).unwrap(), Action::Wait);
        assert_eq!(explorer.phase(), Phase::Arrived);
        assert_eq!(explorer.act(&observation).unwrap(), Action::Wait);
    }
}
