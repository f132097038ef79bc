use crate::model::layout::{BoardLayout, LayoutError};
use crate::model::position::{Position, TileId};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileFace {
    Hidden,
    Revealed,
    Removed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Tile {
    id: TileId,
    face: TileFace,
}

/// Result of turning a single tile face up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reveal {
    pub id: TileId,
    pub position: Position,
    pub outcome: RevealOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealOutcome {
    /// First tile of the turn; nothing to compare yet.
    First,
    /// Second tile shows the same identity as `first`.
    Match { first: Position },
    /// Second tile differs from `first`.
    Mismatch { first: Position },
}

/// What `settle` did with the two face-up tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settled {
    Removed { id: TileId, a: Position, b: Position },
    Hidden { a: Position, b: Position },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardError {
    OutOfBounds(Position),
    EmptySlot(Position),
    AlreadyRemoved(Position),
    AlreadyRevealed(Position),
    TurnComplete,
    NothingToSettle,
    UnpairedRemoval(Position),
    SamePosition(Position),
    NotAPair { a: Position, b: Position },
    IdentityCount { expected: usize, actual: usize },
    Layout(LayoutError),
}

impl fmt::Display for BoardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoardError::OutOfBounds(pos) => write!(f, "position {pos} is outside the board"),
            BoardError::EmptySlot(pos) => write!(f, "no tile was dealt at {pos}"),
            BoardError::AlreadyRemoved(pos) => write!(f, "tile at {pos} has already been removed"),
            BoardError::AlreadyRevealed(pos) => write!(f, "tile at {pos} is already face up"),
            BoardError::TurnComplete => write!(f, "two tiles are already face up"),
            BoardError::NothingToSettle => write!(f, "fewer than two tiles are face up"),
            BoardError::UnpairedRemoval(pos) => {
                write!(f, "removed tile at {pos} has no removed partner")
            }
            BoardError::SamePosition(pos) => write!(f, "both tiles of a pair are at {pos}"),
            BoardError::NotAPair { a, b } => write!(f, "tiles at {a} and {b} are not a pair"),
            BoardError::IdentityCount { expected, actual } => {
                write!(f, "expected {expected} identities but got {actual}")
            }
            BoardError::Layout(err) => write!(f, "invalid layout: {err}"),
        }
    }
}

impl std::error::Error for BoardError {}

impl From<LayoutError> for BoardError {
    fn from(err: LayoutError) -> Self {
        BoardError::Layout(err)
    }
}

/// A dealt board: every occupied slot holds one tile, each identity exactly twice.
#[derive(Debug, Clone)]
pub struct Board {
    layout: BoardLayout,
    slots: Vec<Option<Tile>>,
    face_up: Vec<Position>,
    remaining: usize,
}

impl Board {
    pub fn shuffled<R: rand::Rng + ?Sized>(
        layout: BoardLayout,
        rng: &mut R,
    ) -> Result<Self, BoardError> {
        if layout.tile_count() % 2 != 0 {
            return Err(LayoutError::OddTileCount(layout.tile_count()).into());
        }
        let mut ids: Vec<TileId> = (0..layout.pair_count())
            .flat_map(|pair| [TileId(pair), TileId(pair)])
            .collect();
        ids.shuffle(rng);
        Self::from_identities(layout, ids)
    }

    pub fn with_seed(layout: BoardLayout, seed: u64) -> Result<Self, BoardError> {
        let mut rng = StdRng::seed_from_u64(seed);
        Self::shuffled(layout, &mut rng)
    }

    /// Place `ids` row-major onto the occupied slots of `layout`.
    pub fn from_identities(layout: BoardLayout, ids: Vec<TileId>) -> Result<Self, BoardError> {
        let expected = layout.tile_count() as usize;
        if ids.len() != expected {
            return Err(BoardError::IdentityCount {
                expected,
                actual: ids.len(),
            });
        }
        let mut slots = vec![None; layout.capacity() as usize];
        for (slot, id) in slots.iter_mut().zip(ids) {
            *slot = Some(Tile {
                id,
                face: TileFace::Hidden,
            });
        }
        Ok(Self {
            layout,
            slots,
            face_up: Vec::with_capacity(2),
            remaining: expected,
        })
    }

    pub fn layout(&self) -> &BoardLayout {
        &self.layout
    }

    pub fn remaining_tiles(&self) -> usize {
        self.remaining
    }

    pub fn is_cleared(&self) -> bool {
        self.remaining == 0
    }

    pub fn identity_at(&self, position: Position) -> Option<TileId> {
        self.tile(position).ok().map(|tile| tile.id)
    }

    pub fn face_at(&self, position: Position) -> Option<TileFace> {
        self.tile(position).ok().map(|tile| tile.face)
    }

    /// Positions whose tiles are still in play and face down.
    pub fn hidden_positions(&self) -> Vec<Position> {
        self.layout
            .positions()
            .filter(|pos| self.face_at(*pos) == Some(TileFace::Hidden))
            .collect()
    }

    pub fn reveal(&mut self, position: Position) -> Result<Reveal, BoardError> {
        if self.face_up.len() == 2 {
            return Err(BoardError::TurnComplete);
        }
        let tile = self.tile(position)?;
        match tile.face {
            TileFace::Removed => return Err(BoardError::AlreadyRemoved(position)),
            TileFace::Revealed => return Err(BoardError::AlreadyRevealed(position)),
            TileFace::Hidden => {}
        }
        let id = tile.id;
        self.set_face(position, TileFace::Revealed);

        let outcome = match self.face_up.first().copied() {
            None => RevealOutcome::First,
            Some(first) if self.identity_at(first) == Some(id) => RevealOutcome::Match { first },
            Some(first) => RevealOutcome::Mismatch { first },
        };
        self.face_up.push(position);

        Ok(Reveal {
            id,
            position,
            outcome,
        })
    }

    /// Remove a matched pair or turn a mismatched one face down again.
    pub fn settle(&mut self) -> Result<Settled, BoardError> {
        let [a, b] = match self.face_up.as_slice() {
            [a, b] => [*a, *b],
            _ => return Err(BoardError::NothingToSettle),
        };
        self.face_up.clear();

        let id_a = self.tile(a)?.id;
        let id_b = self.tile(b)?.id;
        if id_a == id_b {
            self.set_face(a, TileFace::Removed);
            self.set_face(b, TileFace::Removed);
            self.remaining -= 2;
            Ok(Settled::Removed { id: id_a, a, b })
        } else {
            self.set_face(a, TileFace::Hidden);
            self.set_face(b, TileFace::Hidden);
            Ok(Settled::Hidden { a, b })
        }
    }

    /// Take a pair off the board without playing it, e.g. when restoring a snapshot.
    pub fn remove_pair(&mut self, a: Position, b: Position) -> Result<TileId, BoardError> {
        if a == b {
            return Err(BoardError::SamePosition(a));
        }
        for pos in [a, b] {
            if self.tile(pos)?.face == TileFace::Removed {
                return Err(BoardError::AlreadyRemoved(pos));
            }
        }
        let id = self.tile(a)?.id;
        if self.tile(b)?.id != id {
            return Err(BoardError::NotAPair { a, b });
        }
        self.set_face(a, TileFace::Removed);
        self.set_face(b, TileFace::Removed);
        self.face_up.retain(|pos| *pos != a && *pos != b);
        self.remaining -= 2;
        Ok(id)
    }

    pub fn removed_positions(&self) -> Vec<Position> {
        self.layout
            .positions()
            .filter(|pos| self.face_at(*pos) == Some(TileFace::Removed))
            .collect()
    }

    fn tile(&self, position: Position) -> Result<Tile, BoardError> {
        let index = self
            .layout
            .index_of(position)
            .ok_or(BoardError::OutOfBounds(position))?;
        self.slots[index].ok_or(BoardError::EmptySlot(position))
    }

    fn set_face(&mut self, position: Position, face: TileFace) {
        if let Some(index) = self.layout.index_of(position) {
            if let Some(tile) = self.slots[index].as_mut() {
                tile.face = face;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn two_by_two() -> Board {
        let layout = BoardLayout::new(2, 2, 4).unwrap();
        Board::from_identities(layout, vec![TileId(1), TileId(1), TileId(2), TileId(2)]).unwrap()
    }

    #[test]
    fn shuffled_board_holds_each_identity_twice() {
        let layout = BoardLayout::new(4, 4, 16).unwrap();
        let board = Board::with_seed(layout, 9).unwrap();
        let mut counts: HashMap<TileId, usize> = HashMap::new();
        for pos in layout.positions() {
            *counts.entry(board.identity_at(pos).unwrap()).or_default() += 1;
        }
        assert_eq!(counts.len(), 8);
        assert!(counts.values().all(|count| *count == 2));
    }

    #[test]
    fn shuffle_with_seed_is_deterministic() {
        let layout = BoardLayout::new(4, 3, 12).unwrap();
        let a = Board::with_seed(layout, 42).unwrap();
        let b = Board::with_seed(layout, 42).unwrap();
        for pos in layout.positions() {
            assert_eq!(a.identity_at(pos), b.identity_at(pos));
        }
    }

    #[test]
    fn odd_tile_count_cannot_be_dealt() {
        let layout = BoardLayout::new(3, 1, 3).unwrap();
        assert!(matches!(
            Board::with_seed(layout, 1),
            Err(BoardError::Layout(LayoutError::OddTileCount(3)))
        ));
    }

    #[test]
    fn matching_pair_is_removed_on_settle() {
        let mut board = two_by_two();
        let first = board.reveal(Position::new(0, 0)).unwrap();
        assert_eq!(first.outcome, RevealOutcome::First);
        let second = board.reveal(Position::new(1, 0)).unwrap();
        assert_eq!(
            second.outcome,
            RevealOutcome::Match {
                first: Position::new(0, 0)
            }
        );

        let settled = board.settle().unwrap();
        assert!(matches!(settled, Settled::Removed { id: TileId(1), .. }));
        assert_eq!(board.remaining_tiles(), 2);
        assert_eq!(
            board.reveal(Position::new(0, 0)),
            Err(BoardError::AlreadyRemoved(Position::new(0, 0)))
        );
    }

    #[test]
    fn mismatch_hides_tiles_again() {
        let mut board = two_by_two();
        board.reveal(Position::new(0, 0)).unwrap();
        let second = board.reveal(Position::new(0, 1)).unwrap();
        assert!(matches!(second.outcome, RevealOutcome::Mismatch { .. }));
        assert_eq!(
            board.reveal(Position::new(1, 1)),
            Err(BoardError::TurnComplete)
        );

        board.settle().unwrap();
        assert_eq!(board.remaining_tiles(), 4);
        assert_eq!(board.hidden_positions().len(), 4);
    }

    #[test]
    fn reveal_rejects_face_up_and_out_of_bounds() {
        let mut board = two_by_two();
        board.reveal(Position::new(0, 0)).unwrap();
        assert_eq!(
            board.reveal(Position::new(0, 0)),
            Err(BoardError::AlreadyRevealed(Position::new(0, 0)))
        );
        assert_eq!(
            board.reveal(Position::new(5, 0)),
            Err(BoardError::OutOfBounds(Position::new(5, 0)))
        );
    }

    #[test]
    fn empty_trailing_slots_are_not_tiles() {
        let layout = BoardLayout::new(3, 2, 4).unwrap();
        let mut board = Board::with_seed(layout, 3).unwrap();
        assert_eq!(
            board.reveal(Position::new(2, 1)),
            Err(BoardError::EmptySlot(Position::new(2, 1)))
        );
    }

    #[test]
    fn remove_pair_rejects_same_position_and_mismatched_tiles() {
        let mut board = two_by_two();
        let origin = Position::new(0, 0);
        assert_eq!(
            board.remove_pair(origin, origin),
            Err(BoardError::SamePosition(origin))
        );
        assert_eq!(
            board.remove_pair(origin, Position::new(0, 1)),
            Err(BoardError::NotAPair {
                a: origin,
                b: Position::new(0, 1)
            })
        );
        assert_eq!(board.remaining_tiles(), 4);
        assert!(board.removed_positions().is_empty());

        assert_eq!(board.remove_pair(origin, Position::new(1, 0)), Ok(TileId(1)));
        assert_eq!(board.remaining_tiles(), 2);
    }

    #[test]
    fn settle_requires_two_face_up_tiles() {
        let mut board = two_by_two();
        assert_eq!(board.settle(), Err(BoardError::NothingToSettle));
    }
}
