use super::{Policy, PolicyContext};
use crate::bot::{Guess, GuessError, GuessSource};
use memory_core::model::position::{Position, TileId};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

/// Reveals uniformly among face-down tiles and remembers nothing.
#[derive(Debug, Clone)]
pub struct RandomPolicy {
    rng: StdRng,
}

impl RandomPolicy {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn choose(&mut self, ctx: &PolicyContext) -> Option<Position> {
        ctx.board.hidden_positions().choose(&mut self.rng).copied()
    }
}

impl Policy for RandomPolicy {
    fn observe_reveal(&mut self, _id: TileId, _position: Position) {}

    fn choose_first(&mut self, ctx: &PolicyContext) -> Result<Guess, GuessError> {
        let position = self.choose(ctx).ok_or(GuessError::BoardExhausted)?;
        Ok(Guess {
            position,
            source: GuessSource::Random,
        })
    }

    fn choose_second(&mut self, ctx: &PolicyContext) -> Result<Guess, GuessError> {
        let position = match (self.choose(ctx), ctx.first) {
            (Some(position), _) => position,
            (None, Some(first)) => return Err(GuessError::NoSecondTile { first }),
            (None, None) => return Err(GuessError::BoardExhausted),
        };
        Ok(Guess {
            position,
            source: GuessSource::Random,
        })
    }
}
