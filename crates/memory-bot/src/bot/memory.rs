use memory_core::model::layout::BoardLayout;
use memory_core::model::position::{Position, TileId};
use std::collections::BTreeMap;
use tracing::{Level, event};

const MEMORY_TARGET: &str = "memory_bot::memory";

/// What a single observation changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    /// First sighting of this identity.
    Seen,
    /// Second sighting at another position: the pair is now known.
    PairLearned { partner: Position },
    /// Same identity at the same position again.
    Repeated,
    /// Identity already belongs to a known pair.
    AlreadyPaired,
    /// Position has left play (or was never dealt); nothing recorded.
    OutOfPlay,
    /// Both tiles of the identity were taken off the board.
    Resolved,
}

/// Everything the opponent remembers about the board.
///
/// Every available position is in exactly one of: the unknown list, a single
/// seen entry, or one of the two slots of a known pair.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    available: Vec<Position>,
    unknown: Vec<Position>,
    seen: BTreeMap<TileId, Position>,
    known_pairs: BTreeMap<TileId, (Position, Position)>,
    verbose: bool,
}

impl MemoryStore {
    pub fn new(layout: &BoardLayout) -> Self {
        let available: Vec<Position> = layout.positions().collect();
        Self {
            unknown: available.clone(),
            available,
            seen: BTreeMap::new(),
            known_pairs: BTreeMap::new(),
            verbose: false,
        }
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn available(&self) -> &[Position] {
        &self.available
    }

    pub fn unknown(&self) -> &[Position] {
        &self.unknown
    }

    pub fn is_available(&self, position: Position) -> bool {
        self.available.contains(&position)
    }

    pub fn seen(&self, id: TileId) -> Option<Position> {
        self.seen.get(&id).copied()
    }

    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }

    pub fn known_pair(&self, id: TileId) -> Option<(Position, Position)> {
        self.known_pairs.get(&id).copied()
    }

    /// Known pair with the smallest identity.
    pub fn first_known_pair(&self) -> Option<(TileId, (Position, Position))> {
        self.known_pairs
            .iter()
            .next()
            .map(|(id, pair)| (*id, *pair))
    }

    pub fn known_pair_count(&self) -> usize {
        self.known_pairs.len()
    }

    pub fn observe(&mut self, id: TileId, position: Position) -> Observation {
        if self.known_pairs.contains_key(&id) {
            return Observation::AlreadyPaired;
        }
        if !self.is_available(position) {
            self.log_memory("ignored", id, position);
            return Observation::OutOfPlay;
        }

        match self.seen.get(&id).copied() {
            Some(previous) if previous == position => Observation::Repeated,
            Some(previous) => {
                self.seen.remove(&id);
                self.known_pairs.insert(id, (position, previous));
                remove_position(&mut self.unknown, position);
                remove_position(&mut self.unknown, previous);
                self.log_memory("learned_pair", id, position);
                Observation::PairLearned { partner: previous }
            }
            None => {
                self.seen.insert(id, position);
                remove_position(&mut self.unknown, position);
                self.log_memory("seen", id, position);
                Observation::Seen
            }
        }
    }

    /// Forget `id` and take both positions out of play for good.
    pub fn resolve(&mut self, id: TileId, a: Position, b: Position) {
        if self.known_pairs.remove(&id).is_none() {
            self.seen.remove(&id);
        }
        for position in [a, b] {
            remove_position(&mut self.unknown, position);
            remove_position(&mut self.available, position);
        }
        self.log_memory("resolved", id, a);
    }

    /// True when available = unknown ⊎ seen ⊎ known pairs, with no overlap.
    pub fn is_consistent(&self) -> bool {
        let mut recorded: Vec<Position> = self.unknown.clone();
        recorded.extend(self.seen.values().copied());
        for (a, b) in self.known_pairs.values() {
            if a == b {
                return false;
            }
            recorded.extend([*a, *b]);
        }
        if self.seen.keys().any(|id| self.known_pairs.contains_key(id)) {
            return false;
        }

        let mut available = self.available.clone();
        available.sort();
        recorded.sort();
        available == recorded
    }

    fn log_memory(&self, action: &'static str, id: TileId, position: Position) {
        if !self.verbose || !tracing::enabled!(target: MEMORY_TARGET, Level::DEBUG) {
            return;
        }
        event!(
            target: MEMORY_TARGET,
            Level::DEBUG,
            action,
            tile = id.value(),
            column = position.column,
            row = position.row,
            unknown = self.unknown.len(),
            seen = self.seen.len(),
            known_pairs = self.known_pairs.len(),
            available = self.available.len(),
        );
    }
}

fn remove_position(list: &mut Vec<Position>, position: Position) -> bool {
    match list.iter().position(|candidate| *candidate == position) {
        Some(index) => {
            list.swap_remove(index);
            true
        }
        None => false,
    }
}
