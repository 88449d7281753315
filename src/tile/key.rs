//! Tile identity.
//!
//! A tile is addressed by its zoom level and its row/column in the
//! `2^zoom × 2^zoom` grid. The canonical string form is `"zoom-row-col"`.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::KeyParseError;

/// Key of a single tile in the slippy-map grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileKey {
    /// Zoom level (grid is `2^zoom` tiles on a side)
    pub zoom: u32,

    /// Tile row (y index, 0 at the top)
    pub row: u32,

    /// Tile column (x index, 0 at the left)
    pub col: u32,
}

impl TileKey {
    /// Create a new tile key.
    pub const fn new(zoom: u32, row: u32, col: u32) -> Self {
        Self { zoom, row, col }
    }

    /// Relative path of this tile inside an on-disk store:
    /// `<zoom>/<row>-<col>.<extension>`.
    pub fn relative_path(&self, extension: &str) -> PathBuf {
        let mut path = PathBuf::from(self.zoom.to_string());
        path.push(format!("{}-{}.{}", self.row, self.col, extension));
        path
    }
}

impl fmt::Display for TileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.zoom, self.row, self.col)
    }
}

impl FromStr for TileKey {
    type Err = KeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || KeyParseError(s.to_string());

        let mut parts = s.split('-');
        let mut next = || -> Result<u32, KeyParseError> {
            parts
                .next()
                .ok_or_else(err)?
                .parse::<u32>()
                .map_err(|_| err())
        };

        let zoom = next()?;
        let row = next()?;
        let col = next()?;

        if parts.next().is_some() {
            return Err(err());
        }

        Ok(Self { zoom, row, col })
    }
}
