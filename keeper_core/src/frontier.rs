use std::collections::HashMap;

use crate::Position;

/// A discovered-but-unvisited position and the travel index it was last seen from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrontierEntry {
    pub position: Position,
    pub travel_index: usize,
}

/// Stack of unexplored positions, most recently sighted on top.
///
/// Re-offering a known position moves it to the top with the newer travel index.
/// Stale stack slots are skipped lazily; `live` is the source of truth, mapping
/// each position to the stamp of its current slot and its travel index.
#[derive(Debug, Clone, Default)]
pub struct Frontier {
    stack: Vec<Slot>,
    live: HashMap<Position, Live>,
    next_stamp: u64,
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    position: Position,
    stamp: u64,
}

#[derive(Debug, Clone, Copy)]
struct Live {
    stamp: u64,
    travel_index: usize,
}

impl Frontier {
    pub fn new() -> Self {
        Frontier::default()
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    pub fn contains(&self, position: Position) -> bool {
        self.live.contains_key(&position)
    }

    /// Pushes `position` on top, replacing any earlier entry for it.
    ///
    /// Callers are responsible for never offering walls, unknown cells or
    /// positions that were already visited.
    pub fn offer(&mut self, position: Position, travel_index: usize) {
        let stamp = self.next_stamp;
        self.next_stamp += 1;
        self.live.insert(
            position,
            Live {
                stamp,
                travel_index,
            },
        );
        self.stack.push(Slot { position, stamp });
        self.compact();
    }

    /// Drops `position` from the frontier. Returns whether it was present.
    pub fn remove(&mut self, position: Position) -> bool {
        self.live.remove(&position).is_some()
    }

    /// The top entry, if any.
    pub fn peek(&self) -> Option<FrontierEntry> {
        self.stack
            .iter()
            .rev()
            .find_map(|slot| self.resolve(slot))
    }

    /// Removes and returns the top entry.
    pub fn pop(&mut self) -> Option<FrontierEntry> {
        while let Some(slot) = self.stack.pop() {
            if let Some(entry) = self.resolve(&slot) {
                self.live.remove(&entry.position);
                return Some(entry);
            }
        }
        None
    }

    /// Pops entries off the top for as long as `no_exit` holds for them.
    ///
    /// `no_exit` is consulted once per candidate, top first, and may record the
    /// candidate as visited before the next one is checked. Returns the pruned
    /// positions in the order they were removed.
    pub fn prune_dead_ends<F>(&mut self, mut no_exit: F) -> Vec<Position>
    where
        F: FnMut(Position) -> bool,
    {
        let mut pruned = Vec::new();
        while let Some(top) = self.peek() {
            if !no_exit(top.position) {
                break;
            }
            self.pop();
            pruned.push(top.position);
        }
        pruned
    }

    /// Live entries from top to bottom.
    pub fn iter(&self) -> impl Iterator<Item = FrontierEntry> + '_ {
        self.stack.iter().rev().filter_map(|slot| self.resolve(slot))
    }

    fn resolve(&self, slot: &Slot) -> Option<FrontierEntry> {
        self.live
            .get(&slot.position)
            .filter(|live| live.stamp == slot.stamp)
            .map(|live| FrontierEntry {
                position: slot.position,
                travel_index: live.travel_index,
            })
    }

    /// Drops stale slots once they outnumber live entries.
    fn compact(&mut self) {
        if self.stack.len() > 2 * self.live.len() + 16 {
            let live = &self.live;
            self.stack.retain(|slot| {
                live.get(&slot.position)
                    .is_some_and(|entry| entry.stamp == slot.stamp)
            });
        }
    }
}
