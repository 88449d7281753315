//! Viewport sizing in whole tiles.

use crate::error::ConfigError;

/// Tiles per axis a viewport never exceeds.
pub const MAX_TILES_PER_AXIS: u32 = 8;

/// Tiles per axis a viewport needs at least.
pub const MIN_TILES_PER_AXIS: u32 = 3;

/// Default tile edge in pixels.
pub const DEFAULT_TILE_SIZE: u32 = 256;

/// Tile dimensions of a drawing surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewportGeometry {
    pub tiles_wide: u32,
    pub tiles_high: u32,
    pub tile_width: u32,
    pub tile_height: u32,
}

impl ViewportGeometry {
    /// Fit whole tiles into a `width_px × height_px` surface.
    ///
    /// Each axis gets `min(pixels / tile, 8)` tiles; fewer than 3 on either
    /// axis is an error, as are non-square tiles.
    pub fn from_pixels(
        width_px: u32,
        height_px: u32,
        tile_width: u32,
        tile_height: u32,
    ) -> Result<Self, ConfigError> {
        if tile_width != tile_height {
            return Err(ConfigError::NonSquareTiles {
                width: tile_width,
                height: tile_height,
            });
        }
        if tile_width == 0 {
            return Err(ConfigError::NonPositive { name: "tile size" });
        }

        let tiles_wide = (width_px / tile_width).min(MAX_TILES_PER_AXIS);
        let tiles_high = (height_px / tile_height).min(MAX_TILES_PER_AXIS);

        if tiles_wide < MIN_TILES_PER_AXIS || tiles_high < MIN_TILES_PER_AXIS {
            return Err(ConfigError::ViewportTooSmall {
                tiles_wide,
                tiles_high,
                min: MIN_TILES_PER_AXIS,
            });
        }

        Ok(Self {
            tiles_wide,
            tiles_high,
            tile_width,
            tile_height,
        })
    }

    /// Pixel size of the tile-aligned drawing area.
    pub fn surface_px(&self) -> (u32, u32) {
        (
            self.tiles_wide * self.tile_width,
            self.tiles_high * self.tile_height,
        )
    }
}
