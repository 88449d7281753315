//! Command-line configuration.
//!
//! Every option can also be set through an environment variable with the
//! `TILEMAP_` prefix:
//!
//! - `TILEMAP_DIR` - Pre-fetch target directory
//! - `TILEMAP_MIN_ZOOM` - Shallowest zoom level (default: 3)
//! - `TILEMAP_MAX_ZOOM` - Deepest zoom level (default: 10)
//! - `TILEMAP_DISK_LIMIT_MB` - Pre-fetch size before confirmation (default: 101)
//! - `TILEMAP_THREADS` - Fetch workers (at least 4 are used)
//! - `TILEMAP_URL_TEMPLATE` - Tile URL with `{z}`, `{y}`, `{x}` placeholders
//! - `TILEMAP_TILE_DIR` - View tiles from a pre-fetched directory instead of HTTP
//! - `TILEMAP_MEMORY_MB` - Tile cache memory budget (default: 100)

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::error::ConfigError;
use crate::fetch::{pool_size, validate_template, DEFAULT_TILE_EXTENSION, DEFAULT_URL_TEMPLATE};
use crate::prefetch::{PrefetchPlan, DEFAULT_DISK_LIMIT_MB};
use crate::tile::{TileCache, TileCoordinateSystem, EVICTION_HEADROOM, MAX_ZOOM};
use crate::viewport::{ViewportGeometry, DEFAULT_TILE_SIZE};

// =============================================================================
// Default Values
// =============================================================================

/// Shallowest zoom the viewer shows.
pub const DEFAULT_MIN_ZOOM: u32 = 3;

/// Deepest zoom the viewer shows.
pub const DEFAULT_MAX_ZOOM: u32 = 10;

/// Default tile cache budget in MiB.
pub const DEFAULT_MEMORY_MB: usize = 100;

/// Default fetch workers for the viewer.
pub const DEFAULT_VIEW_THREADS: usize = 4;

/// Default control loop period in milliseconds.
pub const DEFAULT_TICK_MS: u64 = 100;

/// Default scroll-zoom settle interval in milliseconds.
pub const DEFAULT_SETTLE_MS: u64 = 1000;

// =============================================================================
// CLI Arguments
// =============================================================================

/// Slippy-map tile viewer and pre-fetcher.
#[derive(Parser, Debug, Clone)]
#[command(name = "tilemap-viewer")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn into_command(self) -> Command {
        self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Download every tile of a zoom range to disk.
    Prefetch(PrefetchConfig),

    /// Print the tile under a latitude/longitude.
    Locate(LocateConfig),

    /// Run the viewer headlessly and log what it would draw.
    View(ViewConfig),
}

/// Output format for command results.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

// =============================================================================
// Prefetch
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct PrefetchConfig {
    /// Existing directory to write tiles into.
    #[arg(long, env = "TILEMAP_DIR")]
    pub dir: PathBuf,

    /// Shallowest zoom level to download.
    #[arg(long, default_value_t = DEFAULT_MIN_ZOOM, env = "TILEMAP_MIN_ZOOM")]
    pub min_zoom: u32,

    /// Deepest zoom level to download.
    #[arg(long, default_value_t = DEFAULT_MAX_ZOOM, env = "TILEMAP_MAX_ZOOM")]
    pub max_zoom: u32,

    /// Estimated size in MB above which confirmation is required.
    #[arg(long, default_value_t = DEFAULT_DISK_LIMIT_MB, env = "TILEMAP_DISK_LIMIT_MB")]
    pub disk_limit_mb: u64,

    /// Concurrent downloads. Defaults to the CPU count; never fewer than 4.
    #[arg(long, env = "TILEMAP_THREADS")]
    pub threads: Option<usize>,

    /// Tile URL template.
    #[arg(long, default_value = DEFAULT_URL_TEMPLATE, env = "TILEMAP_URL_TEMPLATE")]
    pub url_template: String,

    /// File extension of written tiles.
    #[arg(long, default_value = DEFAULT_TILE_EXTENSION)]
    pub extension: String,

    /// Skip the size confirmation prompt.
    #[arg(short, long, default_value_t = false)]
    pub yes: bool,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl PrefetchConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.dir.is_dir() {
            return Err(ConfigError::DirectoryNotFound(self.dir.clone()));
        }
        self.plan()?;
        if self.threads == Some(0) {
            return Err(ConfigError::NonPositive { name: "threads" });
        }
        if self.extension.is_empty() {
            return Err(ConfigError::NonPositive {
                name: "extension length",
            });
        }
        validate_template(&self.url_template)
    }

    pub fn plan(&self) -> Result<PrefetchPlan, ConfigError> {
        PrefetchPlan::new(self.min_zoom, self.max_zoom)
    }

    /// Worker count: the requested or detected parallelism, at least 4.
    pub fn threads(&self) -> usize {
        let requested = self.threads.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        });
        pool_size(requested)
    }
}

// =============================================================================
// Locate
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct LocateConfig {
    /// Latitude in degrees.
    #[arg(long, allow_hyphen_values = true)]
    pub lat: f64,

    /// Longitude in degrees.
    #[arg(long, allow_hyphen_values = true)]
    pub lon: f64,

    /// Zoom level.
    #[arg(long)]
    pub zoom: u32,

    /// Print only the containing tile.
    #[arg(long, default_value_t = false)]
    pub snap: bool,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

impl LocateConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.zoom > MAX_ZOOM {
            return Err(ConfigError::ZoomOutOfRange {
                zoom: self.zoom,
                max: MAX_ZOOM,
            });
        }
        Ok(())
    }
}

// =============================================================================
// View
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct ViewConfig {
    /// Drawing surface width in pixels.
    #[arg(long)]
    pub width_px: u32,

    /// Drawing surface height in pixels.
    #[arg(long)]
    pub height_px: u32,

    /// Tile edge in pixels.
    #[arg(long, default_value_t = DEFAULT_TILE_SIZE)]
    pub tile_px: u32,

    /// Initial zoom level.
    #[arg(long, default_value_t = DEFAULT_MIN_ZOOM)]
    pub zoom: u32,

    /// Shallowest zoom level.
    #[arg(long, default_value_t = DEFAULT_MIN_ZOOM, env = "TILEMAP_MIN_ZOOM")]
    pub min_zoom: u32,

    /// Deepest zoom level.
    #[arg(long, default_value_t = DEFAULT_MAX_ZOOM, env = "TILEMAP_MAX_ZOOM")]
    pub max_zoom: u32,

    /// Tile cache memory budget in MiB.
    #[arg(long, default_value_t = DEFAULT_MEMORY_MB, env = "TILEMAP_MEMORY_MB")]
    pub memory_mb: usize,

    /// Concurrent downloads (at least 4 are used).
    #[arg(long, default_value_t = DEFAULT_VIEW_THREADS, env = "TILEMAP_THREADS")]
    pub threads: usize,

    /// Tile URL template.
    #[arg(long, default_value = DEFAULT_URL_TEMPLATE, env = "TILEMAP_URL_TEMPLATE")]
    pub url_template: String,

    /// Read tiles from a pre-fetched directory instead of the network.
    #[arg(long, env = "TILEMAP_TILE_DIR")]
    pub tile_dir: Option<PathBuf>,

    /// Control loop period in milliseconds.
    #[arg(long, default_value_t = DEFAULT_TICK_MS)]
    pub tick_ms: u64,

    /// Scroll-zoom settle interval in milliseconds.
    #[arg(long, default_value_t = DEFAULT_SETTLE_MS)]
    pub settle_ms: u64,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl ViewConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.memory_mb == 0 {
            return Err(ConfigError::NonPositive { name: "memory_mb" });
        }
        if self.threads == 0 {
            return Err(ConfigError::NonPositive { name: "threads" });
        }
        if self.tick_ms == 0 {
            return Err(ConfigError::NonPositive { name: "tick_ms" });
        }
        if let Some(dir) = &self.tile_dir {
            if !dir.is_dir() {
                return Err(ConfigError::DirectoryNotFound(dir.clone()));
            }
        } else {
            validate_template(&self.url_template)?;
        }
        if self.zoom < self.min_zoom || self.zoom > self.max_zoom {
            return Err(ConfigError::InitialZoomOutOfRange {
                zoom: self.zoom,
                min: self.min_zoom,
                max: self.max_zoom,
            });
        }
        let capacity = self.cache_capacity();
        if capacity <= EVICTION_HEADROOM {
            return Err(ConfigError::CacheTooSmall {
                memory_mb: self.memory_mb,
                capacity,
                min: EVICTION_HEADROOM + 1,
            });
        }
        self.coords()?;
        Ok(())
    }

    pub fn geometry(&self) -> Result<ViewportGeometry, ConfigError> {
        ViewportGeometry::from_pixels(self.width_px, self.height_px, self.tile_px, self.tile_px)
    }

    pub fn coords(&self) -> Result<TileCoordinateSystem, ConfigError> {
        let geometry = self.geometry()?;
        TileCoordinateSystem::new(
            self.min_zoom,
            self.max_zoom,
            geometry.tiles_wide,
            geometry.tiles_high,
        )
    }

    /// Cache slots for the configured budget and tile size.
    pub fn cache_capacity(&self) -> usize {
        let budget = self.memory_mb.saturating_mul(1024 * 1024);
        TileCache::capacity_for_budget(budget, self.tile_px, self.tile_px)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    pub fn settle_interval(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

// =============================================================================
// Tests
// =============================================================================
