use core::fmt;
use serde::{Deserialize, Serialize};

/// A tile slot on the board, addressed by zero-based column and row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub column: u32,
    pub row: u32,
}

impl Position {
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}, {}>", self.column, self.row)
    }
}

impl From<(u32, u32)> for Position {
    fn from((column, row): (u32, u32)) -> Self {
        Self::new(column, row)
    }
}

/// The logical card a tile shows once it is face up. Two positions carry the
/// same identity exactly when they form a pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TileId(pub u32);

impl TileId {
    pub const fn value(self) -> u32 {
        self.0
    }
}

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
