use crate::model::position::Position;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default view geometry used when a layout is derived from a tile count alone.
pub const DEFAULT_VIEW_WIDTH: f64 = 792.0;
pub const DEFAULT_VIEW_HEIGHT: f64 = 592.0;
pub const DEFAULT_TILE_BORDER: f64 = 4.0;
pub const DEFAULT_ZOOM_FACTOR: f64 = 2.5;

/// Board dimensions plus the number of occupied slots.
///
/// Tiles fill the grid row by row; when `tile_count < columns * rows` the
/// trailing slots of the last row stay empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardLayout {
    columns: u32,
    rows: u32,
    tile_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
    EmptyDimension { columns: u32, rows: u32 },
    TooManyTiles { tile_count: u32, capacity: u32 },
    OddTileCount(u32),
}

impl fmt::Display for LayoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayoutError::EmptyDimension { columns, rows } => {
                write!(f, "board must have at least one column and row (got {columns}x{rows})")
            }
            LayoutError::TooManyTiles {
                tile_count,
                capacity,
            } => write!(
                f,
                "{tile_count} tiles do not fit on a board with {capacity} slots"
            ),
            LayoutError::OddTileCount(count) => {
                write!(f, "a dealt board needs an even tile count (got {count})")
            }
        }
    }
}

impl std::error::Error for LayoutError {}

impl BoardLayout {
    pub fn new(columns: u32, rows: u32, tile_count: u32) -> Result<Self, LayoutError> {
        if columns == 0 || rows == 0 {
            return Err(LayoutError::EmptyDimension { columns, rows });
        }
        let capacity = columns.saturating_mul(rows);
        if tile_count > capacity {
            return Err(LayoutError::TooManyTiles {
                tile_count,
                capacity,
            });
        }
        Ok(Self {
            columns,
            rows,
            tile_count,
        })
    }

    /// Layout for `pairs` pairs sized for the default view.
    pub fn for_pairs(pairs: u32) -> Result<Self, LayoutError> {
        let tile_count = pairs.saturating_mul(2);
        let (columns, rows) = Self::best_fit(
            tile_count,
            DEFAULT_VIEW_WIDTH,
            DEFAULT_VIEW_HEIGHT,
            DEFAULT_TILE_BORDER,
            DEFAULT_ZOOM_FACTOR,
        );
        Self::new(columns, rows, tile_count)
    }

    pub const fn columns(&self) -> u32 {
        self.columns
    }

    pub const fn rows(&self) -> u32 {
        self.rows
    }

    pub const fn tile_count(&self) -> u32 {
        self.tile_count
    }

    pub const fn capacity(&self) -> u32 {
        self.columns * self.rows
    }

    pub const fn pair_count(&self) -> u32 {
        self.tile_count / 2
    }

    pub const fn contains(&self, position: Position) -> bool {
        position.column < self.columns && position.row < self.rows
    }

    /// Row-major slot index, or `None` outside the grid.
    pub const fn index_of(&self, position: Position) -> Option<usize> {
        if self.contains(position) {
            Some((position.row * self.columns + position.column) as usize)
        } else {
            None
        }
    }

    /// Whether the slot at `position` receives a tile.
    pub fn is_occupied(&self, position: Position) -> bool {
        self.index_of(position)
            .is_some_and(|index| index < self.tile_count as usize)
    }

    /// Occupied positions in dealing order: row by row, column by column.
    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        let columns = self.columns;
        (0..self.tile_count).map(move |index| Position::new(index % columns, index / columns))
    }

    /// Choose a `(columns, rows)` grid for `tile_count` tiles whose aspect
    /// follows the view, keeping whichever of two rounded candidates yields
    /// the larger tiles.
    pub fn best_fit(tile_count: u32, width: f64, height: f64, border: f64, zoom: f64) -> (u32, u32) {
        if tile_count == 0 || width <= 0.0 || height <= 0.0 {
            return (1, 1);
        }
        let n = f64::from(tile_count);
        let c = (n * width / height).sqrt();
        let r = (n * height / width).sqrt();

        let cols1 = (c.round() as u32).max(1);
        let rows1 = (n / f64::from(cols1)).ceil() as u32;
        let rows2 = (r.round() as u32).max(1);
        let cols2 = (n / f64::from(rows2)).ceil() as u32;

        let size1 = tile_size(cols1, rows1, width, height, border, zoom);
        let size2 = tile_size(cols2, rows2, width, height, border, zoom);
        if size1 > size2 {
            (cols1, rows1)
        } else {
            (cols2, rows2)
        }
    }
}

fn tile_size(columns: u32, rows: u32, width: f64, height: f64, border: f64, zoom: f64) -> f64 {
    let tile_width = (width - f64::from(columns.saturating_sub(1)) * border)
        / (f64::from(columns) + zoom - 1.0);
    let tile_height =
        (height - f64::from(rows.saturating_sub(1)) * border) / (f64::from(rows) + zoom - 1.0);
    tile_width.min(tile_height)
}
