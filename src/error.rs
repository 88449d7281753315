use std::path::PathBuf;

use thiserror::Error;

/// Invalid input to the Web Mercator coordinate functions.
///
/// Fatal to the call that produced it; callers validate before use and never retry.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RangeError {
    /// Latitude outside the Web Mercator band
    #[error("Latitude must be between -85.0511 and 85.0511, got {0}")]
    InvalidLatitude(f64),

    /// Longitude outside [-180, 180]
    #[error("Longitude must be between -180.0 and 180.0, got {0}")]
    InvalidLongitude(f64),

    /// Zoom level outside [0, 21]
    #[error("Zoom level must be between 0 and 21, got {0}")]
    InvalidZoom(u32),
}

/// A single tile fetch failed.
///
/// Recorded on the job and counted toward batch completion; never aborts a batch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Transport-level failure (connect, TLS, body read)
    #[error("HTTP error: {0}")]
    Http(String),

    /// The tile server answered with a non-success status
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    /// Local filesystem failure while persisting a tile
    #[error("I/O error: {0}")]
    Io(String),

    /// The worker task running the job panicked or was aborted
    #[error("Fetch task failed: {0}")]
    Task(String),
}

impl From<std::io::Error> for FetchError {
    fn from(err: std::io::Error) -> Self {
        FetchError::Io(err.to_string())
    }
}

/// Invalid startup arguments or viewport settings.
///
/// Reported to the user before any fetch work begins.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Minimum zoom is above the maximum zoom
    #[error("The minimum zoom level ({min}) must not exceed the maximum ({max})")]
    InvalidZoomRange { min: u32, max: u32 },

    /// A zoom level beyond what the tile grid supports
    #[error("Zoom level {zoom} is outside the supported range 0..={max}")]
    ZoomOutOfRange { zoom: u32, max: u32 },

    /// Starting zoom lies outside the configured zoom range
    #[error("Initial zoom level {zoom} is outside the configured range {min}..={max}")]
    InitialZoomOutOfRange { zoom: u32, min: u32, max: u32 },

    /// Memory budget too small to keep any tile resident
    #[error("A memory budget of {memory_mb} MB holds {capacity} tiles; at least {min} are needed")]
    CacheTooSmall {
        memory_mb: usize,
        capacity: usize,
        min: usize,
    },

    /// Target directory does not exist
    #[error("The directory \"{}\" was not found", .0.display())]
    DirectoryNotFound(PathBuf),

    /// A numeric limit that must be positive was zero
    #[error("{name} must be greater than 0")]
    NonPositive { name: &'static str },

    /// Tile images must be square
    #[error("Imagery with unequal dimensions is not supported ({width}x{height})")]
    NonSquareTiles { width: u32, height: u32 },

    /// Surface too small to hold the minimum tile resolution
    #[error("Minimum tile resolution was exceeded: {tiles_wide}x{tiles_high} tiles (need at least {min}x{min})")]
    ViewportTooSmall {
        tiles_wide: u32,
        tiles_high: u32,
        min: u32,
    },

    /// The viewport spans more tiles than the coarsest zoom grid has
    #[error("A {tiles} tile viewport does not fit the {grid} tile grid at zoom {zoom}")]
    ViewportExceedsGrid { tiles: u32, grid: u64, zoom: u32 },

    /// URL template is missing a placeholder
    #[error("URL template must contain {{z}}, {{x}} and {{y}}: {0}")]
    InvalidUrlTemplate(String),

    /// The HTTP client could not be constructed
    #[error("Failed to create HTTP client: {0}")]
    HttpClient(String),

    /// The user declined the download size prompt
    #[error("Download declined by user")]
    Declined,
}

/// A canonical tile key string could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid tile key \"{0}\": expected \"zoom-row-col\"")]
pub struct KeyParseError(pub String);
