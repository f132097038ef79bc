use core::fmt;
use serde::{Deserialize, Serialize};

/// Seat at the table. `First` is the local player; `Second` is the other human
/// or the computer, depending on the [`Opponent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum PlayerSlot {
    First = 0,
    Second = 1,
}

impl PlayerSlot {
    pub const BOTH: [PlayerSlot; 2] = [PlayerSlot::First, PlayerSlot::Second];

    pub const fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(PlayerSlot::First),
            1 => Some(PlayerSlot::Second),
            _ => None,
        }
    }

    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn other(self) -> PlayerSlot {
        match self {
            PlayerSlot::First => PlayerSlot::Second,
            PlayerSlot::Second => PlayerSlot::First,
        }
    }
}

impl fmt::Display for PlayerSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PlayerSlot::First => "first",
            PlayerSlot::Second => "second",
        };
        f.write_str(label)
    }
}

/// Who sits in the second slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Opponent {
    /// Single player against the clock; the turn never changes hands.
    Solo,
    Human,
    #[default]
    Computer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartingPlayer {
    #[default]
    Human,
    Computer,
    Random,
}

impl StartingPlayer {
    /// Resolve the starting slot; `Random` consumes one draw from `rng`.
    pub fn resolve<R: rand::Rng + ?Sized>(self, opponent: Opponent, rng: &mut R) -> PlayerSlot {
        if opponent != Opponent::Computer {
            return PlayerSlot::First;
        }
        match self {
            StartingPlayer::Human => PlayerSlot::First,
            StartingPlayer::Computer => PlayerSlot::Second,
            StartingPlayer::Random => {
                if rng.gen_bool(0.5) {
                    PlayerSlot::First
                } else {
                    PlayerSlot::Second
                }
            }
        }
    }
}
