use crate::Position;

/// Append-only record of every position the keeper has occupied, one per turn.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TravelHistory {
    steps: Vec<Position>,
}

impl TravelHistory {
    pub fn new() -> Self {
        TravelHistory::default()
    }

    /// Records the position of the current turn and returns its index.
    pub fn append(&mut self, position: Position) -> usize {
        self.steps.push(position);
        self.steps.len() - 1
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Index of the most recent entry.
    pub fn last_index(&self) -> Option<usize> {
        self.steps.len().checked_sub(1)
    }

    pub fn get(&self, index: usize) -> Option<Position> {
        self.steps.get(index).copied()
    }

    pub fn as_slice(&self) -> &[Position] {
        &self.steps
    }

    /// Finds the backtracking target for `current`.
    ///
    /// Scans forward from `from_index` for the first recorded position adjacent
    /// to `current`. The latest entry (the current turn itself) is not considered.
    ///
    /// # Arguments
    ///
    /// * `from_index`: Travel index the frontier target was sighted from.
    /// * `current`: The keeper's position this turn.
    pub fn backtrack_from(&self, from_index: usize, current: Position) -> Option<Position> {
        let end = self.steps.len().saturating_sub(1);
        self.steps
            .get(from_index..end)?
            .iter()
            .copied()
            .find(|step| step.is_adjacent(current))
    }
}
