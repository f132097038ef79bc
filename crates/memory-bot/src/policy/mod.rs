mod memory;
mod random;

pub use memory::MemoryPolicy;
pub use random::RandomPolicy;

use crate::bot::{Guess, GuessError};
use memory_core::model::board::Board;
use memory_core::model::position::{Position, TileId};

/// What a policy may look at when choosing a tile.
pub struct PolicyContext<'a> {
    pub board: &'a Board,
    /// Tile already face up this turn, if any.
    pub first: Option<Position>,
}

/// Common interface for the players a harness can seat.
pub trait Policy: Send {
    /// Called for every reveal on the board, including this policy's own.
    fn observe_reveal(&mut self, id: TileId, position: Position);

    fn choose_first(&mut self, ctx: &PolicyContext) -> Result<Guess, GuessError>;

    fn choose_second(&mut self, ctx: &PolicyContext) -> Result<Guess, GuessError>;
}
