use super::{Policy, PolicyContext};
use crate::bot::{Guess, GuessError, MemoryOpponent, OpponentConfig, RngSource};
use memory_core::model::position::{Position, TileId};
use rand::rngs::StdRng;

/// Seats a [`MemoryOpponent`]; the board itself is never inspected.
#[derive(Debug, Clone)]
pub struct MemoryPolicy {
    opponent: MemoryOpponent<RngSource<StdRng>>,
}

impl MemoryPolicy {
    pub fn new(config: &OpponentConfig, seed: u64) -> Self {
        Self {
            opponent: MemoryOpponent::seeded(config, seed),
        }
    }

    pub fn opponent(&self) -> &MemoryOpponent<RngSource<StdRng>> {
        &self.opponent
    }
}

impl Policy for MemoryPolicy {
    fn observe_reveal(&mut self, id: TileId, position: Position) {
        self.opponent.tile_revealed(id, position);
    }

    fn choose_first(&mut self, _ctx: &PolicyContext) -> Result<Guess, GuessError> {
        self.opponent.first_guess()
    }

    fn choose_second(&mut self, _ctx: &PolicyContext) -> Result<Guess, GuessError> {
        self.opponent.second_guess()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::{BotDifficulty, GuessSource};
    use memory_core::model::board::Board;
    use memory_core::model::layout::BoardLayout;

    #[test]
    fn memory_policy_finds_pair_it_watched() {
        let layout = BoardLayout::new(2, 2, 4).unwrap();
        let board =
            Board::from_identities(layout, vec![TileId(0), TileId(1), TileId(1), TileId(0)])
                .unwrap();
        let config = OpponentConfig::for_layout(layout, BotDifficulty::PERFECT);
        let mut policy = MemoryPolicy::new(&config, 3);

        policy.observe_reveal(TileId(0), Position::new(0, 0));
        policy.observe_reveal(TileId(1), Position::new(1, 0));
        policy.observe_reveal(TileId(1), Position::new(0, 1));
        policy.observe_reveal(TileId(0), Position::new(1, 1));

        let ctx = PolicyContext {
            board: &board,
            first: None,
        };
        let first = policy.choose_first(&ctx).unwrap();
        assert_eq!(first.source, GuessSource::KnownPair);
        policy.observe_reveal(board.identity_at(first.position).unwrap(), first.position);
        let second = policy.choose_second(&ctx).unwrap();
        assert_eq!(
            board.identity_at(first.position),
            board.identity_at(second.position)
        );
    }
}
