use crate::model::player::PlayerSlot;

pub const POINTS_PER_TILE: i64 = 20;
pub const POINTS_PER_MISTAKE: i64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreBoard {
    found_pairs: [u32; 2],
    mistakes: [u32; 2],
}

impl ScoreBoard {
    pub const fn new() -> Self {
        Self {
            found_pairs: [0; 2],
            mistakes: [0; 2],
        }
    }

    pub fn record_match(&mut self, slot: PlayerSlot) {
        self.found_pairs[slot.index()] += 1;
    }

    pub fn record_mistake(&mut self, slot: PlayerSlot) {
        self.mistakes[slot.index()] += 1;
    }

    pub fn set_totals(&mut self, found_pairs: [u32; 2], mistakes: [u32; 2]) {
        self.found_pairs = found_pairs;
        self.mistakes = mistakes;
    }

    pub fn found_pairs(&self, slot: PlayerSlot) -> u32 {
        self.found_pairs[slot.index()]
    }

    pub fn mistakes(&self, slot: PlayerSlot) -> u32 {
        self.mistakes[slot.index()]
    }

    pub fn pair_totals(&self) -> &[u32; 2] {
        &self.found_pairs
    }

    pub fn mistake_totals(&self) -> &[u32; 2] {
        &self.mistakes
    }

    /// Slot with more found pairs, `None` on a tie.
    pub fn winner(&self) -> Option<PlayerSlot> {
        let [first, second] = self.found_pairs;
        match first.cmp(&second) {
            std::cmp::Ordering::Greater => Some(PlayerSlot::First),
            std::cmp::Ordering::Less => Some(PlayerSlot::Second),
            std::cmp::Ordering::Equal => None,
        }
    }

    /// Single-player score: 20 per tile, minus elapsed seconds, minus 10 per mistake.
    pub fn solo_points(&self, tile_count: u32, elapsed_secs: u64) -> i64 {
        i64::from(tile_count) * POINTS_PER_TILE
            - i64::try_from(elapsed_secs).unwrap_or(i64::MAX)
            - i64::from(self.mistakes(PlayerSlot::First)) * POINTS_PER_MISTAKE
    }
}

impl Default for ScoreBoard {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::ScoreBoard;
    use crate::model::player::PlayerSlot;

    #[test]
    fn scoreboard_tracks_pairs_and_mistakes() {
        let mut board = ScoreBoard::new();
        board.record_match(PlayerSlot::Second);
        board.record_mistake(PlayerSlot::First);
        board.record_mistake(PlayerSlot::First);
        assert_eq!(board.found_pairs(PlayerSlot::Second), 1);
        assert_eq!(board.found_pairs(PlayerSlot::First), 0);
        assert_eq!(board.mistakes(PlayerSlot::First), 2);
    }

    #[test]
    fn winner_has_more_pairs() {
        let mut board = ScoreBoard::new();
        board.set_totals([3, 5], [0, 9]);
        assert_eq!(board.winner(), Some(PlayerSlot::Second));
    }

    #[test]
    fn equal_pairs_is_a_tie() {
        let mut board = ScoreBoard::new();
        board.set_totals([4, 4], [1, 2]);
        assert_eq!(board.winner(), None);
    }

    #[test]
    fn solo_points_subtract_time_and_mistakes() {
        let mut board = ScoreBoard::new();
        board.set_totals([8, 0], [3, 0]);
        // 16 tiles * 20 - 95 seconds - 3 * 10
        assert_eq!(board.solo_points(16, 95), 195);
    }
}
