//! Drawing boundary.
//!
//! The viewer hands a renderer whole frames: the visible window and the
//! cached payloads inside it. Pixel placement is a fixed function of the
//! window and tile size; decoding and blitting are up to the renderer.

use bytes::Bytes;
use tracing::{debug, trace};

use crate::tile::{TileKey, TileWindow};

/// Pixel offset of `key` within the surface showing `window`.
///
/// Column maps to x and row to y, both relative to the window's start.
pub fn tile_origin(key: &TileKey, window: &TileWindow, tile_width: u32, tile_height: u32) -> (i64, i64) {
    let x = (i64::from(key.col) - i64::from(window.x_start)) * i64::from(tile_width);
    let y = (i64::from(key.row) - i64::from(window.y_start)) * i64::from(tile_height);
    (x, y)
}

/// One frame to draw.
#[derive(Debug, Clone)]
pub struct Frame {
    pub window: TileWindow,
    pub tile_width: u32,
    pub tile_height: u32,

    /// Cached tiles of the window in window key order. Tiles missing from
    /// the cache are absent and stay blank.
    pub tiles: Vec<(TileKey, Bytes)>,
}

impl Frame {
    /// Tiles with their pixel origins.
    pub fn placements(&self) -> impl Iterator<Item = (&TileKey, (i64, i64), &Bytes)> + '_ {
        self.tiles.iter().map(move |(key, payload)| {
            (
                key,
                tile_origin(key, &self.window, self.tile_width, self.tile_height),
                payload,
            )
        })
    }

    /// Window slots with no cached tile.
    pub fn missing(&self) -> usize {
        self.window.tile_count().saturating_sub(self.tiles.len())
    }
}

/// Draws frames. Called from the control thread only.
pub trait Renderer {
    fn draw(&mut self, frame: &Frame);
}

/// Renderer that records frames as log events. Used by the headless viewer.
#[derive(Debug, Default)]
pub struct LogRenderer {
    frames: usize,
}

impl LogRenderer {
    pub fn frames(&self) -> usize {
        self.frames
    }
}

impl Renderer for LogRenderer {
    fn draw(&mut self, frame: &Frame) {
        self.frames += 1;
        for (key, (x, y), payload) in frame.placements() {
            trace!(key = %key, x, y, bytes = payload.len(), "Place tile");
        }
        debug!(
            zoom = frame.window.zoom,
            drawn = frame.tiles.len(),
            missing = frame.missing(),
            "Frame drawn"
        );
    }
}
