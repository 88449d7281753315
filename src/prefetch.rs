//! Batch pre-fetch.
//!
//! Downloads every tile of a zoom range to a [`DiskTileStore`] by driving a
//! [`FetchCoordinator`] headlessly. Keys are enumerated zoom by zoom, row by
//! row, and fetched in fixed-size chunks so only one chunk of payloads is
//! held in memory at a time.

use std::io::{self, BufRead, Write};
use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use tracing::info;

use crate::error::{ConfigError, FetchError};
use crate::fetch::{DiskTileStore, FetchCoordinator, PersistingFetcher, TileFetcher};
use crate::tile::{grid_size, TileCache, TileKey, MAX_ZOOM};

/// Default disk budget before the user is asked to confirm, in MB.
pub const DEFAULT_DISK_LIMIT_MB: u64 = 101;

/// Keys fetched per batch.
pub const PREFETCH_CHUNK: usize = 512;

/// Tile edge assumed by the download estimate.
const ESTIMATE_TILE_PX: u64 = 256;

/// Decoded bytes per pixel assumed by the download estimate.
const ESTIMATE_BYTES_PER_PIXEL: u64 = 3;

// =============================================================================
// Plan
// =============================================================================

/// The zoom range to download and its size estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrefetchPlan {
    min_zoom: u32,
    max_zoom: u32,
}

impl PrefetchPlan {
    pub fn new(min_zoom: u32, max_zoom: u32) -> Result<Self, ConfigError> {
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
        Ok(Self { min_zoom, max_zoom })
    }

    pub fn zooms(&self) -> RangeInclusive<u32> {
        self.min_zoom..=self.max_zoom
    }

    /// Tile count used for the size estimate: `2^((max - min) + 1) - 1`.
    ///
    /// This is the figure shown to the user before downloading. It grows
    /// with the width of the range only, so it understates the real grid
    /// size ([`grid_tile_count`](Self::grid_tile_count)) at deep zooms.
    pub fn expected_tile_count(&self) -> u64 {
        (1u64 << (self.max_zoom - self.min_zoom + 1)) - 1
    }

    /// Estimated download size in MB: `256² × 3 × count / 1024²`.
    pub fn estimated_megabytes(&self) -> u64 {
        ESTIMATE_TILE_PX * ESTIMATE_TILE_PX * ESTIMATE_BYTES_PER_PIXEL * self.expected_tile_count()
            / (1024 * 1024)
    }

    pub fn exceeds(&self, limit_mb: u64) -> bool {
        self.estimated_megabytes() > limit_mb
    }

    /// Number of keys [`keys`](Self::keys) yields.
    pub fn grid_tile_count(&self) -> u64 {
        self.zooms().map(|z| grid_size(z) * grid_size(z)).sum()
    }

    /// Every key of every zoom in the range, row-major within a zoom.
    pub fn keys(&self) -> impl Iterator<Item = TileKey> {
        self.zooms().flat_map(|zoom| {
            let grid = grid_size(zoom) as u32;
            (0..grid).flat_map(move |row| (0..grid).map(move |col| TileKey::new(zoom, row, col)))
        })
    }
}

/// Ask on `output` whether to proceed with an oversized download and read
/// the answer from `input`. Anything other than `y`/`yes` declines.
pub fn confirm_download<R: BufRead, W: Write>(
    plan: &PrefetchPlan,
    limit_mb: u64,
    mut input: R,
    mut output: W,
) -> io::Result<bool> {
    write!(
        output,
        "The estimated download size of {} MB exceeds the {} MB limit. Proceed? (y/n) ",
        plan.estimated_megabytes(),
        limit_mb
    )?;
    output.flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;
    let answer = answer.trim().to_ascii_lowercase();
    Ok(answer == "y" || answer == "yes")
}

// =============================================================================
// Execution
// =============================================================================

/// Totals of a finished pre-fetch run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PrefetchSummary {
    pub directory: PathBuf,
    pub min_zoom: u32,
    pub max_zoom: u32,
    pub requested: u64,
    pub fetched: u64,
    pub failed: u64,
    pub bytes_written: u64,
}

/// Download every tile of `plan` into `store`.
///
/// Individual fetch failures are counted, not fatal. Fails only if a zoom
/// directory cannot be created.
pub async fn run<F>(
    plan: &PrefetchPlan,
    fetcher: F,
    store: DiskTileStore,
    threads: usize,
    poll_interval: Duration,
) -> Result<PrefetchSummary, FetchError>
where
    F: TileFetcher + 'static,
{
    for zoom in plan.zooms() {
        store.ensure_zoom_dir(zoom).await?;
    }

    let mut summary = PrefetchSummary {
        directory: store.root().to_path_buf(),
        min_zoom: plan.min_zoom,
        max_zoom: plan.max_zoom,
        ..Default::default()
    };
    let total = plan.grid_tile_count();

    let mut coordinator = FetchCoordinator::new(PersistingFetcher::new(fetcher, store));
    // Payloads go to disk; the cache only receives folded results.
    let mut cache = TileCache::with_capacity(1);
    let mut keys = plan.keys();

    loop {
        let chunk: Vec<TileKey> = keys.by_ref().take(PREFETCH_CHUNK).collect();
        if chunk.is_empty() {
            break;
        }

        cache.clear();
        coordinator.start_batch(chunk, threads, &cache);
        coordinator.drive_to_completion(&mut cache, poll_interval).await;

        if let Some(batch) = coordinator.current() {
            let tally = batch.tally();
            summary.requested += batch.total() as u64;
            summary.fetched += tally.fetched as u64;
            summary.failed += tally.failed as u64;
            summary.bytes_written += tally.bytes;
        }

        info!(
            done = summary.requested,
            total,
            failed = summary.failed,
            "Pre-fetch progress"
        );
    }

    Ok(summary)
}
