//! Viewer session integration tests.
//!
//! Tests verify:
//! - The initial window is fetched and drawn once complete
//! - Placeholder imagery is detected and not drawn
//! - Zoom, pan and reload only fetch tiles missing from the cache
//! - Scroll zoom is debounced by the settle deadline

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tilemap_viewer::fetch::FetchCoordinator;
use tilemap_viewer::tile::{TileCache, TileCoordinateSystem, TileKey};
use tilemap_viewer::view::{MapSession, TickOutcome};
use tilemap_viewer::viewport::{ViewportGeometry, ViewportState, ZoomCommand, ZoomDirection};

use super::test_utils::{settle, MockTileFetcher, RecordingRenderer};

const SETTLE: Duration = Duration::from_secs(60);

fn session(fetcher: &Arc<MockTileFetcher>) -> MapSession<Arc<MockTileFetcher>> {
    let geometry = ViewportGeometry::from_pixels(2048, 1200, 256, 256).unwrap();
    let coords =
        TileCoordinateSystem::new(3, 10, geometry.tiles_wide, geometry.tiles_high).unwrap();
    MapSession::new(
        ViewportState::with_settle_interval(coords, 3, SETTLE),
        geometry,
        TileCache::default(),
        FetchCoordinator::new(Arc::clone(fetcher)),
        4,
    )
}

fn zoom(direction: ZoomDirection) -> ZoomCommand {
    ZoomCommand::centered(direction)
}

// =============================================================================
// Rendering
// =============================================================================

#[tokio::test]
async fn test_initial_window_is_drawn() {
    let fetcher = MockTileFetcher::new().shared();
    let mut session = session(&fetcher);
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
    assert_eq!(fetcher.request_count(), 32);
    assert_eq!(renderer.frames.len(), 1);

    let frame = &renderer.frames[0];
    let placements: Vec<_> = frame.placements().map(|(k, origin, _)| (*k, origin)).collect();
    assert_eq!(placements[0], (TileKey::new(3, 2, 0), (0, 0)));
    assert_eq!(placements[31], (TileKey::new(3, 5, 7), (1792, 768)));

    // nothing left to draw
    assert_eq!(
        session.tick(Instant::now(), &mut renderer),
        TickOutcome::Idle
    );
}

#[tokio::test]
async fn test_failed_tiles_are_left_blank() {
    let failing = [TileKey::new(3, 2, 0), TileKey::new(3, 4, 6)];
    let fetcher = MockTileFetcher::new().failing(failing).shared();
    let mut session = session(&fetcher);
    let mut renderer = RecordingRenderer::default();

    session.start();
    let outcome = settle(&mut session, &mut renderer).await;

    assert_eq!(
        outcome,
        TickOutcome::Rendered {
            drawn: 30,
            missing: 2
        }
    );
    let drawn: HashSet<_> = renderer.frames[0].tiles.iter().map(|(k, _)| *k).collect();
    assert!(failing.iter().all(|k| !drawn.contains(k)));
}

#[tokio::test]
async fn test_placeholder_imagery_is_not_drawn() {
    let fetcher = MockTileFetcher::new().placeholder().shared();
    let mut session = session(&fetcher);
    let mut renderer = RecordingRenderer::default();

    session.start();
    let outcome = settle(&mut session, &mut renderer).await;

    assert_eq!(outcome, TickOutcome::SkippedDegenerate);
    assert!(renderer.frames.is_empty());
    // tiles are cached all the same
    assert_eq!(session.cache().len(), 32);
}

// =============================================================================
// Navigation
// =============================================================================

#[tokio::test]
async fn test_zoom_out_fetches_only_uncached_tiles() {
    let fetcher = MockTileFetcher::new().shared();
    let mut session = session(&fetcher);
    let mut renderer = RecordingRenderer::default();

    session.start();
    settle(&mut session, &mut renderer).await;
    let initial: HashSet<TileKey> = session.viewport().window().keys().into_iter().collect();

    session.click_zoom(zoom(ZoomDirection::In)).unwrap();
    settle(&mut session, &mut renderer).await;
    assert_eq!(session.viewport().zoom(), 4);
    assert_eq!(fetcher.request_count(), 64);

    session.click_zoom(zoom(ZoomDirection::Out)).unwrap();
    let outcome = settle(&mut session, &mut renderer).await;
    assert_eq!(session.viewport().zoom(), 3);
    assert!(matches!(outcome, TickOutcome::Rendered { missing: 0, .. }));

    let uncached = session
        .viewport()
        .window()
        .keys()
        .into_iter()
        .filter(|k| !initial.contains(k))
        .count();
    assert_eq!(fetcher.request_count(), 64 + uncached);
}

#[tokio::test]
async fn test_click_zoom_below_min_starts_nothing() {
    let fetcher = MockTileFetcher::new().shared();
    let mut session = session(&fetcher);

    session.start();
    assert_eq!(session.click_zoom(zoom(ZoomDirection::Out)), None);
    assert_eq!(session.viewport().zoom(), 3);
}

#[tokio::test]
async fn test_pan_fetches_new_column_only() {
    let fetcher = MockTileFetcher::new().shared();
    let mut session = session(&fetcher);
    let mut renderer = RecordingRenderer::default();

    session.start();
    settle(&mut session, &mut renderer).await;
    session.click_zoom(zoom(ZoomDirection::In)).unwrap();
    settle(&mut session, &mut renderer).await;
    let before = fetcher.request_count();

    session.pan_by(1, 0).unwrap();
    let outcome = settle(&mut session, &mut renderer).await;

    assert!(matches!(outcome, TickOutcome::Rendered { drawn: 32, .. }));
    assert_eq!(fetcher.request_count() - before, 4);
}

#[tokio::test]
async fn test_reload_refetches_nothing_cached() {
    let fetcher = MockTileFetcher::new().shared();
    let mut session = session(&fetcher);
    let mut renderer = RecordingRenderer::default();

    session.start();
    settle(&mut session, &mut renderer).await;

    session.reload();
    let outcome = settle(&mut session, &mut renderer).await;

    assert!(matches!(outcome, TickOutcome::Rendered { drawn: 32, .. }));
    assert_eq!(fetcher.request_count(), 32);
    assert_eq!(renderer.frames.len(), 2);
}

// =============================================================================
// Scroll Debounce
// =============================================================================

#[tokio::test]
async fn test_scroll_zoom_is_debounced() {
    let fetcher = MockTileFetcher::new().shared();
    let mut session = session(&fetcher);
    let mut renderer = RecordingRenderer::default();
    let t0 = Instant::now();

    session.start();
    settle(&mut session, &mut renderer).await;

    assert!(session.scroll_zoom(zoom(ZoomDirection::In), t0).is_some());
    assert!(session.scroll_zoom(zoom(ZoomDirection::In), t0).is_none());
    assert!(session.scroll_zoom(zoom(ZoomDirection::In), t0).is_none());
    assert!(session.click_zoom(zoom(ZoomDirection::In)).is_none());
    settle(&mut session, &mut renderer).await;
    assert_eq!(session.viewport().zoom(), 4);

    // queued scrolls apply as one step once the gate reopens
    session.tick(t0 + SETTLE, &mut renderer);
    assert!(session.viewport().is_zoom_gate_open());
    assert_eq!(session.viewport().zoom(), 5);

    let outcome = settle(&mut session, &mut renderer).await;
    assert!(matches!(outcome, TickOutcome::Rendered { .. }));
}
