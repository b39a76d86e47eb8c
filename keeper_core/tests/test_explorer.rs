//! Turn-by-turn behaviour of the depth-first explorer.

use keeper_core::{
    Action, Cell, Position,
    frontier::FrontierEntry,
    keeper::{Explorer, Keeper, KeeperConfig, Observation, Phase, Senses},
    maze::{ActionResult, load_maze_from_string},
    simulation::Simulation,
};

use Cell::{Key, Open, Wall};

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

// ============== Door sighting ==============

#[test]
fn test_door_sighted_on_second_turn_seeds_path() {
    let maze = load_maze_from_string(
        "
#####
#S..#
#.D.#
#...#
#####",
    )
    .unwrap();
    let mut simulation = Simulation::new(maze, Explorer::default());

    assert_eq!(simulation.step().unwrap(), ActionResult::Success);
    assert!(!simulation.keeper().door_found());
    assert_eq!(simulation.maze().keeper(), p(2, 1));

    simulation.step().unwrap();
    let keeper = simulation.keeper();
    assert!(keeper.door_found());
    assert_eq!(keeper.door(), Some(p(2, 2)));
    assert_eq!(&keeper.door_path().as_slice()[..2], &[p(2, 2), p(2, 1)]);
}

// ============== Greedy key diversion ==============

#[test]
fn test_key_in_sight_preempts_frontier() {
    let mut explorer = Explorer::default();

    // Three open neighbours; the keeper takes the last one offered.
    let action = explorer
        .act(&observe(p(5, 5), [Wall, Open, Open, Open]))
        .unwrap();
    assert_eq!(action, Action::MoveLeft);
    let pending: Vec<FrontierEntry> = explorer.frontier().iter().collect();
    assert_eq!(pending.len(), 2);

    let action = explorer
        .act(&observe(p(5, 4), [Key, Open, Wall, Wall]))
        .unwrap();
    assert_eq!(action, Action::MoveUp);

    let after: Vec<FrontierEntry> = explorer.frontier().iter().collect();
    assert_eq!(
        after[0],
        FrontierEntry {
            position: p(4, 4),
            travel_index: 1
        }
    );
    assert_eq!(&after[1..], pending.as_slice());
}

#[test]
fn test_last_sensed_key_wins() {
    let mut explorer = Explorer::default();
    let action = explorer
        .act(&observe(p(3, 3), [Key, Wall, Open, Key]))
        .unwrap();
    assert_eq!(action, Action::MoveLeft);

    let mut explorer = Explorer::default();
    let action = explorer
        .act(&observe(p(3, 3), [Key, Key, Wall, Wall]))
        .unwrap();
    assert_eq!(action, Action::MoveRight);
}

// ============== Dead-end pruning ==============

#[test]
fn test_walled_pocket_is_pruned_without_being_walked() {
    // Bounded so row 4 is known wall from the start.
    let mut explorer = Explorer::new(KeeperConfig::bounded(5, 6));
    let pocket = p(3, 2);

    let action = explorer
        .act(&observe(p(2, 3), [Open, Wall, Wall, Open]))
        .unwrap();
    assert_eq!(action, Action::MoveLeft);

    let action = explorer
        .act(&observe(p(2, 2), [Wall, Open, Open, Open]))
        .unwrap();
    assert_eq!(action, Action::MoveLeft);
    assert!(explorer.frontier().contains(pocket));

    // Every neighbour of the pocket is now wall or visited.
    let action = explorer
        .act(&observe(p(2, 1), [Wall, Open, Wall, Wall]))
        .unwrap();
    assert!(!explorer.frontier().contains(pocket));
    assert!(explorer.visited().contains(&pocket));
    assert!(!explorer.travel().as_slice().contains(&pocket));

    // The remaining branch at (1, 3) is out of reach, so the keeper backtracks.
    assert_eq!(explorer.frontier().peek().map(|e| e.position), Some(p(1, 3)));
    assert_eq!(action, Action::MoveRight);

    // Back beside the pocket it is not offered again.
    let action = explorer
        .act(&observe(p(2, 2), [Wall, Open, Open, Open]))
        .unwrap();
    assert_eq!(action, Action::MoveRight);
    assert!(!explorer.frontier().contains(pocket));
    assert!(!explorer.travel().as_slice().contains(&pocket));
}

// ============== Backtracking ==============

#[test]
fn test_backtracking_only_steps_onto_visited_cells() {
    let maze = load_maze_from_string(
        "
#########
#S.#....#
#.##.##.#
#....#K.#
##.####.#
#D......#
#########",
    )
    .unwrap();
    let mut simulation = Simulation::new(maze, Explorer::default());

    for _ in 0..200 {
        let before = simulation.maze().keeper();
        let result = simulation.step().unwrap();
        if result == ActionResult::Escaped {
            return;
        }
        assert_eq!(result, ActionResult::Success, "keeper walked into a wall");

        let after = simulation.maze().keeper();
        assert!(before.is_adjacent(after));
        let keeper = simulation.keeper();
        let classification = keeper.map().classify(after);
        assert!(classification.is_passable(), "{after} is {classification:?}");

        // Known cells are only re-entered along the travel history, never
        // onto a pruned dead end.
        if keeper.visited().contains(&after) {
            assert!(keeper.travel().as_slice().contains(&after));
        }
    }
    panic!("keeper did not escape");
}

// ============== Return to the door ==============

#[test]
fn test_last_key_triggers_return_along_door_path() {
    let maze = load_maze_from_string("#######\n#D.S.K#\n#######").unwrap();
    let mut simulation = Simulation::new(maze, Explorer::default());

    for _ in 0..6 {
        assert_eq!(simulation.step().unwrap(), ActionResult::Success);
    }
    assert_eq!(simulation.maze().keeper(), p(1, 5));
    assert_eq!(
        simulation.keeper().door_path().as_slice(),
        &[p(1, 1), p(1, 2), p(1, 3), p(1, 4)]
    );
    assert_eq!(simulation.keeper().phase(), Phase::Exploring);

    simulation.step().unwrap();
    assert_eq!(simulation.maze().keeper(), p(1, 4));
    assert_eq!(simulation.keeper().phase(), Phase::Returning);
    assert_eq!(
        simulation.keeper().door_path().as_slice(),
        &[p(1, 1), p(1, 2), p(1, 3)]
    );

    let summary = simulation.run(20).unwrap();
    assert_eq!(summary.turns, 10);
    assert_eq!(summary.keys_collected, 1);
}

#[test]
fn test_dead_end_door_starts_return_immediately() {
    // The door's only neighbour is visited the turn it is sighted, so it gets
    // pruned; with every key already held the keeper heads straight home.
    let maze = load_maze_from_string("#####\n#S.D#\n#####").unwrap();
    let bounds = maze.bounds();
    let mut simulation = Simulation::new(
        maze,
        Explorer::new(KeeperConfig {
            bounds: Some(bounds),
        }),
    );
    let summary = simulation.run(10).unwrap();
    assert_eq!(summary.turns, 2);
}

// ============== Invariants over a whole run ==============

#[test]
fn test_bookkeeping_invariants_hold_every_turn() {
    let maze = load_maze_from_string(include_str!("../../maps/maze01.txt")).unwrap();
    let bounds = maze.bounds();
    let mut simulation = Simulation::new(
        maze,
        Explorer::new(KeeperConfig {
            bounds: Some(bounds),
        }),
    );
    let mut visited_before = 0;

    loop {
        let result = simulation.step().unwrap();
        let keeper = simulation.keeper();

        assert!(keeper.visited().len() >= visited_before);
        visited_before = keeper.visited().len();
        for position in keeper.travel().as_slice() {
            assert!(keeper.visited().contains(position));
        }
        for entry in keeper.frontier().iter() {
            assert!(!keeper.visited().contains(&entry.position));
            assert!(keeper.map().classify(entry.position).is_passable());
        }
        for pair in keeper.door_path().as_slice().windows(2) {
            assert!(pair[0].is_adjacent(pair[1]));
        }

        if result == ActionResult::Escaped {
            break;
        }
        assert!(simulation.turns() < 10_000, "keeper is wandering");
    }
    assert_eq!(simulation.maze().keys_held(), 3);
}
