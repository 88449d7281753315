//! Web Mercator tile math and viewport tile windows.
//!
//! Two concerns live here:
//!
//! - Conversion between geographic degrees and fractional tile positions
//!   ([`degree_to_tile`], [`tile_to_degree`]).
//! - Computation of the rectangular window of tiles a fixed-size viewport
//!   shows, initially and after every zoom or pan ([`TileCoordinateSystem`]).
//!
//! # Window rounding
//!
//! The initial window is centred on the grid midpoint with
//! `start = center - round(width / 2 + 0.49)`, so odd widths put the extra
//! tile before the centre and even widths split evenly.
//!
//! Zooming in scales the current start index up to the finer grid; zooming
//! out divides `start + 1` down to the coarser grid. The anchor offset is added
//! in both cases and the result truncated, which keeps a coarser window
//! snapped to the tile already under the anchor.

use std::f64::consts::PI;

use serde::Serialize;

use crate::error::{ConfigError, RangeError};

use super::key::TileKey;

/// Southern limit of the Web Mercator projection.
pub const MIN_LAT: f64 = -85.0511;

/// Northern limit of the Web Mercator projection.
pub const MAX_LAT: f64 = 85.0511;

pub const MIN_LON: f64 = -180.0;

pub const MAX_LON: f64 = 180.0;

/// Deepest zoom level accepted by the coordinate functions.
pub const MAX_ZOOM: u32 = 21;

/// Number of tiles on one side of the grid at `zoom`.
#[inline]
pub fn grid_size(zoom: u32) -> u64 {
    1u64 << zoom
}

// =============================================================================
// Degree <-> Tile
// =============================================================================

/// Convert latitude/longitude in degrees to a fractional tile position.
///
/// Returns `(x_tile, y_tile)` at `zoom`. The integer part of each value is the
/// tile index, the fractional part the position inside that tile.
pub fn degree_to_tile(lat: f64, lon: f64, zoom: u32) -> Result<(f64, f64), RangeError> {
    if !(MIN_LAT..=MAX_LAT).contains(&lat) {
        return Err(RangeError::InvalidLatitude(lat));
    }
    if !(MIN_LON..=MAX_LON).contains(&lon) {
        return Err(RangeError::InvalidLongitude(lon));
    }
    if zoom > MAX_ZOOM {
        return Err(RangeError::InvalidZoom(zoom));
    }

    let n = grid_size(zoom) as f64;
    let lat_rad = lat.to_radians();

    let x_tile = (lon + 180.0) / 360.0 * n;
    let y_tile = (1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / PI) / 2.0 * n;

    Ok((x_tile, y_tile))
}

/// Key of the tile containing a coordinate.
///
/// The fractional position is truncated; the east edge (`lon = 180`) and the
/// southern limit fall into the last row/column instead of one past the grid.
pub fn tile_key_at(lat: f64, lon: f64, zoom: u32) -> Result<TileKey, RangeError> {
    let (x_tile, y_tile) = degree_to_tile(lat, lon, zoom)?;
    let last = (grid_size(zoom) - 1) as f64;

    let col = x_tile.trunc().clamp(0.0, last) as u32;
    let row = y_tile.trunc().clamp(0.0, last) as u32;

    Ok(TileKey::new(zoom, row, col))
}

/// Convert a (possibly fractional) tile position back to latitude/longitude.
///
/// Exact inverse of [`degree_to_tile`]. Not bounds-checked: positions outside
/// the grid still invert mathematically.
pub fn tile_to_degree(x_tile: f64, y_tile: f64, zoom: u32) -> (f64, f64) {
    let n = 2f64.powi(zoom as i32);

    let lon = x_tile / n * 360.0 - 180.0;
    let lat_rad = (PI * (1.0 - 2.0 * y_tile / n)).sinh().atan();

    (lat_rad.to_degrees(), lon)
}

// =============================================================================
// Tile Window
// =============================================================================

/// Inclusive rectangle of tile indices visible in the viewport at one zoom.
///
/// Always exactly `tiles_wide × tiles_high` and inside the zoom's grid.
/// Replaced wholesale on every pan or zoom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TileWindow {
    pub zoom: u32,
    pub x_start: u32,
    pub x_end: u32,
    pub y_start: u32,
    pub y_end: u32,
}

impl TileWindow {
    /// Number of tile columns.
    pub fn width(&self) -> u32 {
        self.x_end - self.x_start + 1
    }

    /// Number of tile rows.
    pub fn height(&self) -> u32 {
        self.y_end - self.y_start + 1
    }

    pub fn tile_count(&self) -> usize {
        self.width() as usize * self.height() as usize
    }

    /// Whether `key` lies inside this window (same zoom, in bounds).
    pub fn contains(&self, key: &TileKey) -> bool {
        key.zoom == self.zoom
            && (self.x_start..=self.x_end).contains(&key.col)
            && (self.y_start..=self.y_end).contains(&key.row)
    }

    /// All keys of the window in request order: column by column, top to
    /// bottom within each column.
    pub fn keys(&self) -> Vec<TileKey> {
        let mut keys = Vec::with_capacity(self.tile_count());
        for col in self.x_start..=self.x_end {
            for row in self.y_start..=self.y_end {
                keys.push(TileKey::new(self.zoom, row, col));
            }
        }
        keys
    }
}

// =============================================================================
// Anchor
// =============================================================================

/// Normalised focus point inside the viewport, `(0,0)` top-left to `(1,1)`
/// bottom-right.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anchor {
    pub x: f64,
    pub y: f64,
}

impl Anchor {
    pub const CENTER: Anchor = Anchor { x: 0.5, y: 0.5 };

    /// Create an anchor, clamping both components into `[0, 1]`.
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x: clamp_unit(x),
            y: clamp_unit(y),
        }
    }

    /// Anchor for a pixel position on a surface of the given size.
    pub fn from_pixels(px: f64, py: f64, surface_width: f64, surface_height: f64) -> Self {
        if surface_width <= 0.0 || surface_height <= 0.0 {
            return Self::CENTER;
        }
        Self::new(px / surface_width, py / surface_height)
    }
}

fn clamp_unit(v: f64) -> f64 {
    if v.is_nan() {
        0.5
    } else {
        v.clamp(0.0, 1.0)
    }
}

// =============================================================================
// Tile Coordinate System
// =============================================================================

/// Window geometry for a viewport of fixed tile dimensions over a zoom range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileCoordinateSystem {
    min_zoom: u32,
    max_zoom: u32,
    tiles_wide: u32,
    tiles_high: u32,
}

impl TileCoordinateSystem {
    /// Create a coordinate system.
    ///
    /// The viewport must fit inside the grid at `min_zoom`, otherwise no
    /// window at that zoom could satisfy the bounds invariant.
    pub fn new(
        min_zoom: u32,
        max_zoom: u32,
        tiles_wide: u32,
        tiles_high: u32,
    ) -> Result<Self, ConfigError> {
        if min_zoom > max_zoom {
            return Err(ConfigError::InvalidZoomRange {
                min: min_zoom,
                max: max_zoom,
            });
        }
        if max_zoom > MAX_ZOOM {
            return Err(ConfigError::ZoomOutOfRange {
                zoom: max_zoom,
                max: MAX_ZOOM,
            });
        }
        if tiles_wide == 0 {
            return Err(ConfigError::NonPositive { name: "tiles_wide" });
        }
        if tiles_high == 0 {
            return Err(ConfigError::NonPositive { name: "tiles_high" });
        }

        let grid = grid_size(min_zoom);
        let widest = tiles_wide.max(tiles_high);
        if u64::from(widest) > grid {
            return Err(ConfigError::ViewportExceedsGrid {
                tiles: widest,
                grid,
                zoom: min_zoom,
            });
        }

        Ok(Self {
            min_zoom,
            max_zoom,
            tiles_wide,
            tiles_high,
        })
    }

    pub fn min_zoom(&self) -> u32 {
        self.min_zoom
    }

    pub fn max_zoom(&self) -> u32 {
        self.max_zoom
    }

    pub fn tiles_wide(&self) -> u32 {
        self.tiles_wide
    }

    pub fn tiles_high(&self) -> u32 {
        self.tiles_high
    }

    /// Clamp a zoom level into the configured range.
    pub fn clamp_zoom(&self, zoom: u32) -> u32 {
        zoom.clamp(self.min_zoom, self.max_zoom)
    }

    /// Window centred on the grid midpoint at `zoom`.
    ///
    /// Zoom levels outside the configured range are clamped into it.
    pub fn initial_window(&self, zoom: u32) -> TileWindow {
        let zoom = self.clamp_zoom(zoom);
        let center = grid_size(zoom) as f64 / 2.0;
        let grid = grid_size(zoom) as i64;

        let (x_start, x_end) = centered_span(center, self.tiles_wide, grid);
        let (y_start, y_end) = centered_span(center, self.tiles_high, grid);

        TileWindow {
            zoom,
            x_start,
            x_end,
            y_start,
            y_end,
        }
    }

    /// Window at `to_zoom` re-centred on the tile under `anchor`.
    ///
    /// Returns `window` unchanged when `to_zoom` is outside the configured
    /// range or equal to the window's zoom.
    pub fn window_after_zoom(&self, window: &TileWindow, to_zoom: u32, anchor: Anchor) -> TileWindow {
        let from_zoom = window.zoom;
        if to_zoom < self.min_zoom || to_zoom > self.max_zoom || to_zoom == from_zoom {
            return *window;
        }

        let grid = grid_size(to_zoom) as i64;
        let (x_start, x_end) = zoom_axis(
            window.x_start,
            self.tiles_wide,
            anchor.x,
            from_zoom,
            to_zoom,
            grid,
        );
        let (y_start, y_end) = zoom_axis(
            window.y_start,
            self.tiles_high,
            anchor.y,
            from_zoom,
            to_zoom,
            grid,
        );

        TileWindow {
            zoom: to_zoom,
            x_start,
            x_end,
            y_start,
            y_end,
        }
    }

    /// Window shifted by whole tiles, clamped to the grid.
    pub fn pan(&self, window: &TileWindow, dx: i64, dy: i64) -> TileWindow {
        let grid = grid_size(window.zoom) as i64;

        let x_start = i64::from(window.x_start) + dx;
        let y_start = i64::from(window.y_start) + dy;
        let (x_start, x_end) = clamp_span(x_start, x_start + i64::from(self.tiles_wide) - 1, self.tiles_wide, grid);
        let (y_start, y_end) = clamp_span(y_start, y_start + i64::from(self.tiles_high) - 1, self.tiles_high, grid);

        TileWindow {
            zoom: window.zoom,
            x_start,
            x_end,
            y_start,
            y_end,
        }
    }
}

/// Start/end of a `tiles`-long span centred on `center`.
fn centered_span(center: f64, tiles: u32, grid: i64) -> (u32, u32) {
    let before = (f64::from(tiles) / 2.0 + 0.49).round();
    let start = (center - before).trunc() as i64;
    let end = start + i64::from(tiles) - 1;
    clamp_span(start, end, tiles, grid)
}

/// One axis of a zoom transition.
fn zoom_axis(start: u32, tiles: u32, frac: f64, from_zoom: u32, to_zoom: u32, grid: i64) -> (u32, u32) {
    let diff = to_zoom as i32 - from_zoom as i32;
    let scale = 2f64.powi(diff);
    let offset = frac * f64::from(tiles) * scale;

    let at = if diff > 0 {
        (f64::from(start) * scale + offset).trunc() as i64
    } else {
        ((f64::from(start) + 1.0) / 2f64.powi(-diff) + offset).trunc() as i64
    };

    let halved = (f64::from(tiles) / 2f64.powi(diff.abs())).trunc() as i64;
    let lower = (halved - i64::from(frac >= 0.5)).max(0);
    let upper = (i64::from(tiles) - 1) - lower;

    clamp_span(at - lower, at + upper, tiles, grid)
}

/// Pin a span to the grid: a negative start snaps to 0, an end past the last
/// tile snaps to the last tile. Width is preserved.
fn clamp_span(mut start: i64, mut end: i64, tiles: u32, grid: i64) -> (u32, u32) {
    let span = i64::from(tiles) - 1;
    if start < 0 {
        start = 0;
        end = span;
    }
    if end > grid - 1 {
        end = grid - 1;
        start = end - span;
    }
    (start.max(0) as u32, end.max(0) as u32)
}

// =============================================================================
// Tests
// =============================================================================
