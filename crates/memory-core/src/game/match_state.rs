use crate::model::board::{Board, BoardError, Reveal, RevealOutcome, Settled};
use crate::model::layout::BoardLayout;
use crate::model::player::{Opponent, PlayerSlot, StartingPlayer};
use crate::model::position::Position;
use crate::model::score::ScoreBoard;
use rand::SeedableRng;
use rand::rngs::StdRng;

/// What a single reveal meant for the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnEvent {
    /// First tile of a turn is face up.
    Revealed { reveal: Reveal, player: PlayerSlot },
    /// Second tile matched; `player` keeps the turn.
    PairFound {
        reveal: Reveal,
        player: PlayerSlot,
        game_over: bool,
    },
    /// Second tile did not match; the turn passes to `next`.
    Missed {
        reveal: Reveal,
        player: PlayerSlot,
        next: PlayerSlot,
    },
}

impl TurnEvent {
    pub fn reveal(&self) -> Reveal {
        match self {
            TurnEvent::Revealed { reveal, .. }
            | TurnEvent::PairFound { reveal, .. }
            | TurnEvent::Missed { reveal, .. } => *reveal,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MatchState {
    board: Board,
    scores: ScoreBoard,
    opponent: Opponent,
    current: PlayerSlot,
    turns_taken: [u32; 2],
    seed: u64,
}

impl MatchState {
    /// Deal a board from `seed`; a random starting player draws from the same stream
    /// after the shuffle.
    pub fn with_seed(
        layout: BoardLayout,
        opponent: Opponent,
        starting: StartingPlayer,
        seed: u64,
    ) -> Result<Self, BoardError> {
        let mut rng = StdRng::seed_from_u64(seed);
        let board = Board::shuffled(layout, &mut rng)?;
        let current = starting.resolve(opponent, &mut rng);
        Ok(Self {
            board,
            scores: ScoreBoard::new(),
            opponent,
            current,
            turns_taken: [0; 2],
            seed,
        })
    }

    /// Start from a constructed board, e.g. in tests.
    pub fn from_board(board: Board, opponent: Opponent, current: PlayerSlot) -> Self {
        Self {
            board,
            scores: ScoreBoard::new(),
            opponent,
            current,
            turns_taken: [0; 2],
            seed: 0,
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn board_mut(&mut self) -> &mut Board {
        &mut self.board
    }

    pub fn scores(&self) -> &ScoreBoard {
        &self.scores
    }

    pub fn scores_mut(&mut self) -> &mut ScoreBoard {
        &mut self.scores
    }

    pub fn opponent(&self) -> Opponent {
        self.opponent
    }

    pub fn current_player(&self) -> PlayerSlot {
        self.current
    }

    pub fn set_current_player(&mut self, slot: PlayerSlot) {
        self.current = slot;
    }

    pub fn turns_taken(&self, slot: PlayerSlot) -> u32 {
        self.turns_taken[slot.index()]
    }

    pub fn is_over(&self) -> bool {
        self.board.is_cleared()
    }

    pub fn winner(&self) -> Option<PlayerSlot> {
        self.scores.winner()
    }

    pub fn reveal(&mut self, position: Position) -> Result<TurnEvent, BoardError> {
        let reveal = self.board.reveal(position)?;
        let player = self.current;

        let event = match reveal.outcome {
            RevealOutcome::First => TurnEvent::Revealed { reveal, player },
            RevealOutcome::Match { .. } => {
                self.scores.record_match(player);
                self.turns_taken[player.index()] += 1;
                TurnEvent::PairFound {
                    reveal,
                    player,
                    game_over: self.board.remaining_tiles() == 2,
                }
            }
            RevealOutcome::Mismatch { .. } => {
                self.scores.record_mistake(player);
                self.turns_taken[player.index()] += 1;
                let next = match self.opponent {
                    Opponent::Solo => player,
                    Opponent::Human | Opponent::Computer => player.other(),
                };
                self.current = next;
                TurnEvent::Missed {
                    reveal,
                    player,
                    next,
                }
            }
        };
        Ok(event)
    }

    /// Clear the two face-up tiles so the next turn can begin.
    pub fn settle(&mut self) -> Result<Settled, BoardError> {
        self.board.settle()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::position::TileId;

    fn two_by_two(opponent: Opponent) -> MatchState {
        let layout = BoardLayout::new(2, 2, 4).unwrap();
        let board =
            Board::from_identities(layout, vec![TileId(1), TileId(1), TileId(2), TileId(2)])
                .unwrap();
        MatchState::from_board(board, opponent, PlayerSlot::First)
    }

    #[test]
    fn match_keeps_turn_and_scores() {
        let mut state = two_by_two(Opponent::Computer);
        state.reveal(Position::new(0, 0)).unwrap();
        let event = state.reveal(Position::new(1, 0)).unwrap();
        assert!(matches!(
            event,
            TurnEvent::PairFound {
                player: PlayerSlot::First,
                game_over: false,
                ..
            }
        ));
        state.settle().unwrap();
        assert_eq!(state.current_player(), PlayerSlot::First);
        assert_eq!(state.scores().found_pairs(PlayerSlot::First), 1);
    }

    #[test]
    fn mismatch_passes_turn() {
        let mut state = two_by_two(Opponent::Human);
        state.reveal(Position::new(0, 0)).unwrap();
        let event = state.reveal(Position::new(0, 1)).unwrap();
        assert!(matches!(
            event,
            TurnEvent::Missed {
                next: PlayerSlot::Second,
                ..
            }
        ));
        assert_eq!(state.scores().mistakes(PlayerSlot::First), 1);
        assert_eq!(state.current_player(), PlayerSlot::Second);
    }

    #[test]
    fn solo_mismatch_keeps_single_player() {
        let mut state = two_by_two(Opponent::Solo);
        state.reveal(Position::new(0, 0)).unwrap();
        state.reveal(Position::new(1, 1)).unwrap();
        assert_eq!(state.current_player(), PlayerSlot::First);
    }

    #[test]
    fn last_pair_reports_game_over() {
        let mut state = two_by_two(Opponent::Computer);
        state.reveal(Position::new(0, 0)).unwrap();
        state.reveal(Position::new(1, 0)).unwrap();
        state.settle().unwrap();
        state.reveal(Position::new(0, 1)).unwrap();
        let event = state.reveal(Position::new(1, 1)).unwrap();
        assert!(matches!(event, TurnEvent::PairFound { game_over: true, .. }));
        state.settle().unwrap();
        assert!(state.is_over());
        assert_eq!(state.winner(), Some(PlayerSlot::First));
    }

    #[test]
    fn seeded_matches_deal_identically() {
        let layout = BoardLayout::for_pairs(6).unwrap();
        let a = MatchState::with_seed(layout, Opponent::Computer, StartingPlayer::Random, 77)
            .unwrap();
        let b = MatchState::with_seed(layout, Opponent::Computer, StartingPlayer::Random, 77)
            .unwrap();
        assert_eq!(a.current_player(), b.current_player());
        for pos in layout.positions() {
            assert_eq!(a.board().identity_at(pos), b.board().identity_at(pos));
        }
    }
}
