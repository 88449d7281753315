//! # tilemap-viewer
//!
//! Core of a slippy-map tile viewer over Web Mercator imagery.
//!
//! The library maps a fixed-size viewport onto the tile grid, fetches the
//! visible tiles concurrently through a pluggable [`fetch::TileFetcher`],
//! keeps them in a bounded recency cache and hands finished frames to a
//! [`view::Renderer`]. It also drives a batch pre-fetcher that mirrors a
//! zoom range to disk.
//!
//! ## Features
//!
//! - **Tile math**: degree/tile conversion, anchored zoom and pan windows
//! - **Bounded cache**: LRU with two slots of headroom, sized from a memory budget
//! - **Concurrent fetching**: per-refresh batches on a tokio worker pool,
//!   results folded on a single control thread
//! - **Scroll debounce**: zoom gate with an explicit settle deadline
//! - **Placeholder detection**: batches of identical imagery are not drawn
//! - **Offline tiles**: pre-fetched directories double as a tile source
//!
//! ## Architecture
//!
//! - [`tile`] - Tile keys, coordinate math and the tile cache
//! - [`viewport`] - Viewport sizing and the zoom/pan state machine
//! - [`fetch`] - Fetcher boundary, HTTP and disk sources, batch coordination
//! - [`view`] - Staleness checks, rendering boundary and the session loop
//! - [`prefetch`] - Zoom-range download to disk
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::time::Instant;
//! use tilemap_viewer::{
//!     FetchCoordinator, HttpTileFetcher, LogRenderer, MapSession, TileCache,
//!     TileCoordinateSystem, ViewportGeometry, ViewportState, DEFAULT_URL_TEMPLATE,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let geometry = ViewportGeometry::from_pixels(2048, 1200, 256, 256)?;
//!     let coords = TileCoordinateSystem::new(3, 10, geometry.tiles_wide, geometry.tiles_high)?;
//!     let fetcher = HttpTileFetcher::new(DEFAULT_URL_TEMPLATE)?;
//!
//!     let mut session = MapSession::new(
//!         ViewportState::new(coords, 3),
//!         geometry,
//!         TileCache::default(),
//!         FetchCoordinator::new(fetcher),
//!         4,
//!     );
//!     session.start();
//!
//!     let mut renderer = LogRenderer::default();
//!     let _ = session.tick(Instant::now(), &mut renderer);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod fetch;
pub mod prefetch;
pub mod tile;
pub mod view;
pub mod viewport;

// Re-export commonly used types
pub use config::{Cli, Command, LocateConfig, OutputFormat, PrefetchConfig, ViewConfig};
pub use error::{ConfigError, FetchError, KeyParseError, RangeError};
pub use fetch::{
    BatchId, BatchStatus, DiskTileStore, FetchBatch, FetchCoordinator, FetchJob, HttpTileFetcher,
    JobOutcome, PersistingFetcher, TileFetcher, DEFAULT_URL_TEMPLATE,
};
pub use prefetch::{PrefetchPlan, PrefetchSummary};
pub use tile::{
    degree_to_tile, tile_key_at, tile_to_degree, Anchor, CacheEntry, SampleDigest, TileCache,
    TileCoordinateSystem, TileKey, TileWindow,
};
pub use view::{tile_origin, Frame, LogRenderer, MapSession, Renderer, StalenessDetector, TickOutcome};
pub use viewport::{ViewportGeometry, ViewportState, ZoomCommand, ZoomDirection};
