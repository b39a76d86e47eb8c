use tracing::{debug, info, warn};

use crate::{
    keeper::{Keeper, KeeperError, Observation, Senses},
    maze::{ActionResult, Maze},
};

/// Errors that end a simulation run early.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SimulationError {
    #[error("Keeper failed on turn {turn}: {source}")]
    Keeper { turn: usize, source: KeeperError },
    #[error("Keeper did not escape within {turns} turns")]
    TurnLimit { turns: usize },
}

/// Summary of a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub turns: usize,
    pub keys_collected: usize,
}

/// Drives a keeper through a maze one tick at a time.
#[derive(Debug)]
pub struct Simulation<K> {
    maze: Maze,
    keeper: K,
    turns: usize,
}

impl<K: Keeper> Simulation<K> {
    pub fn new(maze: Maze, keeper: K) -> Self {
        Simulation {
            maze,
            keeper,
            turns: 0,
        }
    }

    pub fn maze(&self) -> &Maze {
        &self.maze
    }

    pub fn keeper(&self) -> &K {
        &self.keeper
    }

    /// Number of turns played so far.
    pub fn turns(&self) -> usize {
        self.turns
    }

    /// Processes one turn: sense, ask the keeper, apply its move.
    ///
    /// Once the keeper has escaped the keeper is no longer consulted.
    pub fn step(&mut self) -> Result<ActionResult, SimulationError> {
        if self.maze.is_escaped() {
            return Ok(ActionResult::Escaped);
        }
        let observation = Observation::sense(&self.maze);
        let turn = self.turns;
        let action = self
            .keeper
            .act(&observation)
            .map_err(|source| SimulationError::Keeper { turn, source })?;
        self.turns += 1;

        let result = self.maze.apply(action);
        match &result {
            ActionResult::Success => {
                debug!(turn, ?action, position = %self.maze.keeper(), "moved");
            }
            ActionResult::Failure(reason) => {
                warn!(turn, ?action, reason = reason.as_str(), "move refused");
            }
            ActionResult::Escaped => {
                info!(turns = self.turns, "keeper escaped");
            }
        }
        Ok(result)
    }

    /// Plays turns until the keeper escapes or `max_turns` have been played.
    pub fn run(&mut self, max_turns: usize) -> Result<RunSummary, SimulationError> {
        while self.turns < max_turns {
            if self.step()? == ActionResult::Escaped {
                return Ok(RunSummary {
                    turns: self.turns,
                    keys_collected: self.maze.keys_held(),
                });
            }
        }
        Err(SimulationError::TurnLimit { turns: self.turns })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        Action,
        keeper::{Explorer, KeeperConfig},
        maze::load_maze_from_string,
    };

    /// Keeper that always walks one way.
    struct Stubborn(Action);

    impl Keeper for Stubborn {
        fn act(&mut self, _observation: &Observation) -> Result<Action, KeeperError> {
            Ok(self.0)
        }
    }

    #[test]
    fn corridor_run_collects_key_and_escapes() {
        let maze = load_maze_from_string("#######\n#S.K.D#\n#######").unwrap();
        let bounds = maze.bounds();
        let config = KeeperConfig {
            bounds: Some(bounds),
        };
        let mut simulation = Simulation::new(maze, Explorer::new(config));
        let summary = simulation.run(50).unwrap();
        assert_eq!(summary, RunSummary { turns: 4, keys_collected: 1 });
        assert!(simulation.maze().is_escaped());
    }

    #[test]
    fn refused_moves_still_count_as_turns() {
        let maze = load_maze_from_string("#####\n#S.D#\n#####").unwrap();
        let mut simulation = Simulation::new(maze, Stubborn(Action::MoveUp));
        assert!(matches!(simulation.step(), Ok(ActionResult::Failure(_))));
        assert_eq!(simulation.turns(), 1);
        assert_eq!(
            simulation.run(5),
            Err(SimulationError::TurnLimit { turns: 5 })
        );
    }

    #[test]
    fn keeper_errors_carry_the_turn() {
        let maze = load_maze_from_string("#####\n#S#D#\n#####").unwrap();
        let mut simulation = Simulation::new(maze, Explorer::default());
        let err = simulation.run(10).unwrap_err();
        assert!(matches!(
            err,
            SimulationError::Keeper {
                turn: 0,
                source: KeeperError::EmptyFrontier { .. }
            }
        ));
    }
}
