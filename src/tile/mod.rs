//! Tile layer.
//!
//! Identity, geometry and storage of slippy-map tiles.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │        ViewportState / MapSession       │
//! └───────────┬─────────────────┬───────────┘
//!             │                 │
//!             ▼                 ▼
//! ┌──────────────────────┐  ┌───────────────┐
//! │ TileCoordinateSystem │  │   TileCache   │
//! │  (degree <-> tile,   │  │ (LRU, 2-slot  │
//! │   window math)       │  │   headroom)   │
//! └──────────┬───────────┘  └───────┬───────┘
//!            │                      │
//!            └──────────┬───────────┘
//!                       ▼
//!          ┌─────────────────────────┐
//!          │ TileKey / SampleDigest  │
//!          └─────────────────────────┘
//! ```
//!
//! # Components
//!
//! - [`TileKey`]: `(zoom, row, col)` with canonical string form `"zoom-row-col"`
//! - [`TileWindow`]: inclusive tile rectangle visible in the viewport
//! - [`TileCoordinateSystem`]: initial, zoomed and panned window computation
//! - [`TileCache`]: bounded recency-ordered payload store
//! - [`SampleDigest`]: every-16th-byte payload fingerprint

mod cache;
mod coords;
mod digest;
mod key;

pub use cache::{
    CacheEntry, TileCache, DEFAULT_MEMORY_BUDGET, EVICTION_HEADROOM, MAX_CACHE_ENTRIES,
};
pub use coords::{
    degree_to_tile, grid_size, tile_key_at, tile_to_degree, Anchor, TileCoordinateSystem,
    TileWindow, MAX_LAT, MAX_LON, MAX_ZOOM, MIN_LAT, MIN_LON,
};
pub use digest::{SampleDigest, DIGEST_STRIDE};
pub use key::TileKey;
