//! Fetch coordination integration tests.
//!
//! Tests verify:
//! - Cached keys are never fetched
//! - Completion counting across successes and failures
//! - Results of superseded batches still reach the cache
//! - Worker pool sizing, shared across batches

use std::sync::Arc;
use std::time::Duration;

use tilemap_viewer::fetch::{FetchCoordinator, JobOutcome};
use tilemap_viewer::tile::{SampleDigest, TileCache, TileKey};

use super::test_utils::{drain, tile_payload, MockTileFetcher, TICK};

fn column(zoom: u32, col: u32, rows: u32) -> Vec<TileKey> {
    (0..rows).map(|row| TileKey::new(zoom, row, col)).collect()
}

fn preload(cache: &mut TileCache, key: TileKey) {
    let payload = tile_payload(&key);
    cache.put(key, payload.clone(), SampleDigest::of(&payload));
}

// =============================================================================
// Cache Interaction
// =============================================================================

#[tokio::test]
async fn test_cached_keys_are_skipped() {
    let fetcher = MockTileFetcher::new().shared();
    let mut coordinator = FetchCoordinator::from_arc(Arc::clone(&fetcher));
    let mut cache = TileCache::with_capacity(100);

    let keys = column(5, 3, 5);
    preload(&mut cache, keys[1]);
    preload(&mut cache, keys[3]);

    coordinator.start_batch(keys.clone(), 4, &cache);
    let status = drain(&mut coordinator, &mut cache).await;

    assert_eq!(status.total, 5);
    assert_eq!(status.completed, 5);
    assert_eq!(fetcher.request_count(), 3);

    let mut requested = fetcher.requests().await;
    requested.sort();
    assert_eq!(requested, vec![keys[0], keys[2], keys[4]]);

    let batch = coordinator.current().unwrap();
    assert_eq!(batch.jobs()[1].outcome, JobOutcome::CachedSkip);
    assert_eq!(batch.jobs()[3].outcome, JobOutcome::CachedSkip);
    assert!(keys.iter().all(|k| cache.contains(k)));
}

#[tokio::test]
async fn test_fully_cached_batch_completes_immediately() {
    let fetcher = MockTileFetcher::new().shared();
    let mut coordinator = FetchCoordinator::from_arc(Arc::clone(&fetcher));
    let mut cache = TileCache::with_capacity(100);

    let keys = column(4, 0, 3);
    for key in &keys {
        preload(&mut cache, *key);
    }

    coordinator.start_batch(keys, 4, &cache);
    let status = coordinator.poll(&mut cache).unwrap();
    assert!(status.is_complete());
    assert_eq!(fetcher.request_count(), 0);
}

#[tokio::test]
async fn test_jobs_keep_request_order() {
    let fetcher = MockTileFetcher::new().shared();
    let mut coordinator = FetchCoordinator::from_arc(Arc::clone(&fetcher));
    let mut cache = TileCache::with_capacity(100);

    let keys = column(6, 9, 8);
    coordinator.start_batch(keys.clone(), 8, &cache);
    drain(&mut coordinator, &mut cache).await;

    let order: Vec<_> = coordinator
        .current()
        .unwrap()
        .jobs()
        .iter()
        .map(|job| job.key)
        .collect();
    assert_eq!(order, keys);
}

// =============================================================================
// Failures
// =============================================================================

#[tokio::test]
async fn test_failures_count_toward_completion() {
    let keys = column(7, 2, 6);
    let fetcher = MockTileFetcher::new()
        .failing([keys[0], keys[4]])
        .shared();
    let mut coordinator = FetchCoordinator::from_arc(Arc::clone(&fetcher));
    let mut cache = TileCache::with_capacity(100);

    coordinator.start_batch(keys.clone(), 2, &cache);
    let status = drain(&mut coordinator, &mut cache).await;
    assert_eq!(status.completed, 6);

    let tally = coordinator.current().unwrap().tally();
    assert_eq!(tally.failed, 2);
    assert_eq!(tally.fetched, 4);
    assert!(!cache.contains(&keys[0]));
    assert!(!cache.contains(&keys[4]));
    assert!(cache.contains(&keys[1]));
}

// =============================================================================
// Superseded Batches
// =============================================================================

#[tokio::test]
async fn test_superseded_batch_still_fills_cache() {
    // two gated jobs hold two of the four shared workers
    let first = column(8, 0, 2);
    let second = column(8, 1, 4);
    let fetcher = MockTileFetcher::new().gated(first.clone()).shared();
    let mut coordinator = FetchCoordinator::from_arc(Arc::clone(&fetcher));
    let mut cache = TileCache::with_capacity(100);

    let old = coordinator.start_batch(first.clone(), 4, &cache);
    tokio::time::sleep(Duration::from_millis(20)).await;
    let status = coordinator.poll(&mut cache).unwrap();
    assert_eq!(status.id, old);
    assert_eq!(status.completed, 0);

    let new = coordinator.start_batch(second.clone(), 4, &cache);
    assert_ne!(old, new);
    let status = drain(&mut coordinator, &mut cache).await;
    assert_eq!((status.completed, status.total), (4, 4));

    fetcher.release();
    for _ in 0..400 {
        coordinator.poll(&mut cache);
        if first.iter().all(|k| cache.contains(k)) {
            break;
        }
        tokio::time::sleep(TICK).await;
    }

    assert!(first.iter().all(|k| cache.contains(k)));
    let status = coordinator.status().unwrap();
    assert_eq!(status.id, new);
    assert_eq!((status.completed, status.total), (4, 4));
}

#[tokio::test]
async fn test_progress_is_observable() {
    let keys = column(9, 5, 6);
    let fetcher = MockTileFetcher::new().gated(keys[3..].to_vec()).shared();
    let mut coordinator = FetchCoordinator::from_arc(Arc::clone(&fetcher));
    let mut cache = TileCache::with_capacity(100);

    coordinator.start_batch(keys, 8, &cache);

    let mut status = coordinator.poll(&mut cache).unwrap();
    for _ in 0..400 {
        if status.completed == 3 {
            break;
        }
        tokio::time::sleep(TICK).await;
        status = coordinator.poll(&mut cache).unwrap();
    }
    assert_eq!(status.completed, 3);
    assert!(!status.is_complete());
    assert_eq!(coordinator.current().unwrap().progress(), 0.5);

    fetcher.release();
    let status = drain(&mut coordinator, &mut cache).await;
    assert!(status.is_complete());
}

// =============================================================================
// Worker Pool
// =============================================================================

#[tokio::test]
async fn test_pool_has_at_least_four_workers() {
    let keys = column(10, 0, 10);
    let fetcher = MockTileFetcher::new().gated(keys.clone()).shared();
    let mut coordinator = FetchCoordinator::from_arc(Arc::clone(&fetcher));
    let mut cache = TileCache::with_capacity(100);

    coordinator.start_batch(keys, 1, &cache);
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(fetcher.in_flight(), 4);

    fetcher.release();
    drain(&mut coordinator, &mut cache).await;
    assert_eq!(fetcher.max_in_flight(), 4);
    assert_eq!(fetcher.request_count(), 10);
}

#[tokio::test]
async fn test_superseded_batches_share_the_pool() {
    let batches: Vec<_> = (0..5).map(|col| column(11, col, 8)).collect();
    let fetcher = MockTileFetcher::new()
        .gated(batches.concat())
        .shared();
    let mut coordinator = FetchCoordinator::from_arc(Arc::clone(&fetcher));
    let mut cache = TileCache::with_capacity(100);

    for keys in &batches {
        coordinator.start_batch(keys.clone(), 4, &cache);
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(coordinator.workers(), 4);
    assert_eq!(fetcher.in_flight(), 4);

    fetcher.release();
    drain(&mut coordinator, &mut cache).await;
    assert!(fetcher.max_in_flight() <= coordinator.workers());
}
