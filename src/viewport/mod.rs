//! Viewport geometry and input state.

mod geometry;
mod state;

pub use geometry::{ViewportGeometry, DEFAULT_TILE_SIZE, MAX_TILES_PER_AXIS, MIN_TILES_PER_AXIS};
pub use state::{ViewportState, ZoomCommand, ZoomDirection, DEFAULT_SETTLE_INTERVAL};
