//! Tile fetching.
//!
//! [`TileFetcher`] is the boundary to wherever tiles come from. The crate
//! ships an HTTP implementation ([`HttpTileFetcher`]), an on-disk store that
//! doubles as an offline source ([`DiskTileStore`]) and a decorator that
//! persists everything it fetches ([`PersistingFetcher`]).
//!
//! [`FetchCoordinator`] turns a list of keys into a [`FetchBatch`], runs the
//! uncached ones concurrently and folds results into the cache.

mod batch;
mod coordinator;
mod disk;
mod fetcher;
mod http;

pub use batch::{BatchId, BatchTally, FetchBatch, FetchJob, JobOutcome};
pub use coordinator::{pool_size, BatchStatus, FetchCoordinator, MIN_WORKERS};
pub use disk::{DiskTileStore, DEFAULT_TILE_EXTENSION};
pub use fetcher::{PersistingFetcher, TileFetcher};
pub use http::{validate_template, HttpTileFetcher, DEFAULT_TIMEOUT, DEFAULT_URL_TEMPLATE};
