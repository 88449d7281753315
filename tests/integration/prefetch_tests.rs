//! Batch pre-fetch integration tests.
//!
//! Tests verify:
//! - Every tile of the zoom range is written under `<zoom>/<row>-<col>.<ext>`
//! - Failed downloads are counted and leave no file behind
//! - A pre-fetched directory serves as an offline tile source

use std::sync::Arc;

use tilemap_viewer::fetch::{DiskTileStore, FetchCoordinator};
use tilemap_viewer::prefetch::{self, PrefetchPlan, PREFETCH_CHUNK};
use tilemap_viewer::tile::{TileCache, TileCoordinateSystem, TileKey};
use tilemap_viewer::view::{MapSession, TickOutcome};
use tilemap_viewer::viewport::{ViewportGeometry, ViewportState};

use super::test_utils::{settle, tile_payload, MockTileFetcher, RecordingRenderer, TICK};

#[tokio::test]
async fn test_prefetch_writes_every_tile() {
    let dir = tempfile::tempdir().unwrap();
    let fetcher = MockTileFetcher::new().shared();
    let plan = PrefetchPlan::new(0, 2).unwrap();

    let summary = prefetch::run(
        &plan,
        Arc::clone(&fetcher),
        DiskTileStore::new(dir.path()),
        4,
        TICK,
    )
    .await
    .unwrap();

    assert_eq!(summary.requested, 21);
    assert_eq!(summary.fetched, 21);
    assert_eq!(summary.failed, 0);
    assert_eq!(fetcher.request_count(), 21);

    for zoom in 0..=2 {
        assert!(dir.path().join(zoom.to_string()).is_dir());
    }
    let key = TileKey::new(2, 3, 1);
    let written = std::fs::read(dir.path().join("2").join("3-1.jpg")).unwrap();
    assert_eq!(written, tile_payload(&key).to_vec());
    assert_eq!(summary.bytes_written, 21 * tile_payload(&key).len() as u64);
}

#[tokio::test]
async fn test_prefetch_counts_failures() {
    let dir = tempfile::tempdir().unwrap();
    let failing = [TileKey::new(1, 0, 1), TileKey::new(1, 1, 1)];
    let fetcher = MockTileFetcher::new().failing(failing).shared();
    let plan = PrefetchPlan::new(1, 1).unwrap();

    let summary = prefetch::run(
        &plan,
        fetcher,
        DiskTileStore::with_extension(dir.path(), "png"),
        4,
        TICK,
    )
    .await
    .unwrap();

    assert_eq!(summary.requested, 4);
    assert_eq!(summary.fetched, 2);
    assert_eq!(summary.failed, 2);
    assert!(dir.path().join("1").join("0-0.png").is_file());
    assert!(!dir.path().join("1").join("0-1.png").exists());
}

#[tokio::test]
async fn test_prefetch_spans_several_chunks() {
    let dir = tempfile::tempdir().unwrap();
    let fetcher = MockTileFetcher::new().shared();
    let plan = PrefetchPlan::new(0, 5).unwrap();
    assert!(plan.grid_tile_count() > 2 * PREFETCH_CHUNK as u64);

    let summary = prefetch::run(
        &plan,
        Arc::clone(&fetcher),
        DiskTileStore::new(dir.path()),
        8,
        TICK,
    )
    .await
    .unwrap();

    assert_eq!(summary.requested, plan.grid_tile_count());
    assert_eq!(summary.fetched, plan.grid_tile_count());
    assert_eq!(fetcher.request_count() as u64, plan.grid_tile_count());
    assert!(dir.path().join("5").join("31-31.jpg").is_file());
}

#[tokio::test]
async fn test_prefetched_directory_serves_viewer() {
    let dir = tempfile::tempdir().unwrap();
    let plan = PrefetchPlan::new(3, 3).unwrap();
    prefetch::run(
        &plan,
        MockTileFetcher::new(),
        DiskTileStore::new(dir.path()),
        4,
        TICK,
    )
    .await
    .unwrap();

    let geometry = ViewportGeometry::from_pixels(2048, 1200, 256, 256).unwrap();
    let coords =
        TileCoordinateSystem::new(3, 10, geometry.tiles_wide, geometry.tiles_high).unwrap();
    let mut session = MapSession::new(
        ViewportState::new(coords, 3),
        geometry,
        TileCache::default(),
        FetchCoordinator::new(DiskTileStore::new(dir.path())),
        4,
    );
    let mut renderer = RecordingRenderer::default();

    session.start();
    let outcome = settle(&mut session, &mut renderer).await;
    assert_eq!(
        outcome,
        TickOutcome::Rendered {
            drawn: 32,
            missing: 0
        }
    );

    let (key, payload) = &renderer.frames[0].tiles[0];
    assert_eq!(*payload, tile_payload(key));
}
