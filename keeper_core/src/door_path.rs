use crate::Position;

/// Route recorded from the door to the keeper, shortened whenever the keeper
/// comes back next to an earlier point of it.
///
/// Index 0 is the door; the last entry is the most recently recorded position.
/// Consecutive entries are always adjacent, so walking the route back to front
/// ends on the door.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DoorPath {
    route: Vec<Position>,
}

impl DoorPath {
    pub fn new() -> Self {
        DoorPath::default()
    }

    /// Starts the route on first sighting of the door from `seen_from`.
    pub fn seed(&mut self, door: Position, seen_from: Position) {
        self.route.clear();
        self.route.push(door);
        self.route.push(seen_from);
    }

    pub fn len(&self) -> usize {
        self.route.len()
    }

    pub fn is_empty(&self) -> bool {
        self.route.is_empty()
    }

    pub fn as_slice(&self) -> &[Position] {
        &self.route
    }

    /// Cuts the route after the first entry adjacent to `current`.
    ///
    /// The most recent entry is never a cut point. Returns the number of
    /// entries discarded.
    pub fn shortcut(&mut self, current: Position) -> usize {
        let scan = self.route.len().saturating_sub(1);
        match self.route[..scan]
            .iter()
            .position(|step| step.is_adjacent(current))
        {
            Some(index) => {
                let before = self.route.len();
                self.route.truncate(index + 1);
                before - self.route.len()
            }
            None => 0,
        }
    }

    /// Shortcuts against `current`, then appends it.
    pub fn record(&mut self, current: Position) {
        self.shortcut(current);
        self.route.push(current);
    }

    /// Removes and returns the next position to walk to on the way back.
    pub fn next_step(&mut self) -> Option<Position> {
        self.route.pop()
    }
}
