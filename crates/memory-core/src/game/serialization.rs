use super::match_state::MatchState;
use crate::model::board::BoardError;
use crate::model::layout::BoardLayout;
use crate::model::player::{Opponent, PlayerSlot, StartingPlayer};
use crate::model::position::{Position, TileId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchSnapshot {
    pub seed: u64,
    pub layout: BoardLayout,
    pub opponent: Opponent,
    pub found_pairs: [u32; 2],
    pub mistakes: [u32; 2],
    pub current_player: PlayerSlot,
    #[serde(default)]
    pub removed: Vec<Position>,
}

impl MatchSnapshot {
    pub fn capture(state: &MatchState) -> Self {
        MatchSnapshot {
            seed: state.seed(),
            layout: *state.board().layout(),
            opponent: state.opponent(),
            found_pairs: *state.scores().pair_totals(),
            mistakes: *state.scores().mistake_totals(),
            current_player: state.current_player(),
            removed: state.board().removed_positions(),
        }
    }

    /// Re-deal from the seed and take the recorded pairs back off the board.
    pub fn restore(self) -> Result<MatchState, BoardError> {
        let layout = BoardLayout::new(
            self.layout.columns(),
            self.layout.rows(),
            self.layout.tile_count(),
        )?;
        let mut state =
            MatchState::with_seed(layout, self.opponent, StartingPlayer::Human, self.seed)?;
        state.set_current_player(self.current_player);
        state
            .scores_mut()
            .set_totals(self.found_pairs, self.mistakes);

        let mut pending: HashMap<TileId, Position> = HashMap::new();
        for position in self.removed {
            let id = state
                .board()
                .identity_at(position)
                .ok_or(BoardError::OutOfBounds(position))?;
            match pending.remove(&id) {
                Some(partner) => {
                    state.board_mut().remove_pair(partner, position)?;
                }
                None => {
                    pending.insert(id, position);
                }
            }
        }
        if let Some(position) = pending.into_values().next() {
            return Err(BoardError::UnpairedRemoval(position));
        }
        Ok(state)
    }

    pub fn to_json(state: &MatchState) -> serde_json::Result<String> {
        let snapshot = Self::capture(state);
        serde_json::to_string_pretty(&snapshot)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
