//! tilemap-viewer - slippy-map tile viewer and pre-fetcher.

use clap::Parser;
use std::io;
use std::process::ExitCode;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tilemap_viewer::{
    config::{
        Cli, Command, LocateConfig, OutputFormat, PrefetchConfig, ViewConfig, DEFAULT_TICK_MS,
    },
    error::ConfigError,
    fetch::{DiskTileStore, FetchCoordinator, HttpTileFetcher, TileFetcher},
    prefetch::{self, confirm_download},
    tile::{degree_to_tile, tile_key_at, TileCache},
    view::{LogRenderer, MapSession, TickOutcome},
    viewport::ViewportState,
};

/// How often the pre-fetcher drains finished jobs.
const POLL_INTERVAL: Duration = Duration::from_millis(DEFAULT_TICK_MS);

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.into_command() {
        Command::Prefetch(config) => run_prefetch(config).await,
        Command::Locate(config) => run_locate(config),
        Command::View(config) => run_view(config).await,
    }
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "tilemap_viewer=debug"
    } else {
        "tilemap_viewer=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn print_json(value: &impl serde::Serialize) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: failed to serialise output: {}", e);
            ExitCode::FAILURE
        }
    }
}

// =============================================================================
// Prefetch Command
// =============================================================================

async fn run_prefetch(config: PrefetchConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }
    let plan = match config.plan() {
        Ok(plan) => plan,
        Err(e) => {
            error!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    info!(
        min_zoom = config.min_zoom,
        max_zoom = config.max_zoom,
        estimated_mb = plan.estimated_megabytes(),
        tiles = plan.grid_tile_count(),
        "Planning pre-fetch"
    );

    if plan.exceeds(config.disk_limit_mb) && !config.yes {
        let stdin = io::stdin();
        match confirm_download(&plan, config.disk_limit_mb, stdin.lock(), io::stdout()) {
            Ok(true) => {}
            Ok(false) => {
                error!("{}", ConfigError::Declined);
                return ExitCode::FAILURE;
            }
            Err(e) => {
                error!("Failed to read confirmation: {}", e);
                return ExitCode::FAILURE;
            }
        }
    }

    let fetcher = match HttpTileFetcher::new(config.url_template.clone()) {
        Ok(fetcher) => fetcher,
        Err(e) => {
            error!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let store = DiskTileStore::with_extension(&config.dir, config.extension.clone());
    let threads = config.threads();

    info!(threads, dir = %config.dir.display(), "Starting pre-fetch");
    let summary = match prefetch::run(&plan, fetcher, store, threads, POLL_INTERVAL).await {
        Ok(summary) => summary,
        Err(e) => {
            error!("Pre-fetch failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if summary.failed > 0 {
        warn!(failed = summary.failed, "Some tiles could not be downloaded");
    }

    match config.format {
        OutputFormat::Json => print_json(&summary),
        OutputFormat::Text => {
            println!(
                "Fetched {} of {} tiles into {} ({} failed, {:.1} MB written)",
                summary.fetched,
                summary.requested,
                summary.directory.display(),
                summary.failed,
                summary.bytes_written as f64 / (1024.0 * 1024.0)
            );
            ExitCode::SUCCESS
        }
    }
}

// =============================================================================
// Locate Command
// =============================================================================

fn run_locate(config: LocateConfig) -> ExitCode {
    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    let position = degree_to_tile(config.lat, config.lon, config.zoom)
        .and_then(|pos| tile_key_at(config.lat, config.lon, config.zoom).map(|key| (pos, key)));
    let ((x, y), key) = match position {
        Ok(found) => found,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match (config.format, config.snap) {
        (OutputFormat::Json, true) => print_json(&key),
        (OutputFormat::Json, false) => print_json(&serde_json::json!({
            "lat": config.lat,
            "lon": config.lon,
            "zoom": config.zoom,
            "x": x,
            "y": y,
            "key": key.to_string(),
        })),
        (OutputFormat::Text, true) => {
            println!("{}", key);
            ExitCode::SUCCESS
        }
        (OutputFormat::Text, false) => {
            println!("x = {:.6}, y = {:.6} (tile {})", x, y, key);
            ExitCode::SUCCESS
        }
    }
}

// =============================================================================
// View Command
// =============================================================================

async fn run_view(config: ViewConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    match config.tile_dir.clone() {
        Some(dir) => {
            info!(dir = %dir.display(), "Viewing pre-fetched tiles");
            drive_view(&config, DiskTileStore::new(dir)).await
        }
        None => match HttpTileFetcher::new(config.url_template.clone()) {
            Ok(fetcher) => drive_view(&config, fetcher).await,
            Err(e) => {
                error!("Configuration error: {}", e);
                ExitCode::FAILURE
            }
        },
    }
}

async fn drive_view<F: TileFetcher + 'static>(config: &ViewConfig, fetcher: F) -> ExitCode {
    let (geometry, coords) = match config.geometry().and_then(|g| config.coords().map(|c| (g, c))) {
        Ok(pair) => pair,
        Err(e) => {
            error!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let viewport = ViewportState::with_settle_interval(coords, config.zoom, config.settle_interval());
    let cache = TileCache::with_capacity(config.cache_capacity());
    info!(
        tiles_wide = geometry.tiles_wide,
        tiles_high = geometry.tiles_high,
        cache_slots = cache.capacity(),
        zoom = viewport.zoom(),
        "Viewport ready"
    );

    let mut session = MapSession::new(
        viewport,
        geometry,
        cache,
        FetchCoordinator::new(fetcher),
        config.threads,
    );
    let mut renderer = LogRenderer::default();
    let mut ticker = tokio::time::interval(config.tick_interval());

    session.start();
    loop {
        ticker.tick().await;
        match session.tick(Instant::now(), &mut renderer) {
            TickOutcome::Pending { .. } => continue,
            TickOutcome::Rendered { drawn, missing } => {
                info!(drawn, missing, "Window drawn");
                if missing > 0 {
                    warn!(missing, "Some tiles could not be fetched");
                }
                return ExitCode::SUCCESS;
            }
            TickOutcome::SkippedDegenerate => return ExitCode::SUCCESS,
            TickOutcome::Idle => return ExitCode::SUCCESS,
        }
    }
}
