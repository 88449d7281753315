//! Test utilities for integration tests.
//!
//! Provides a mock tile fetcher with request tracking, per-key failures and
//! gating, plus helpers for driving sessions and coordinators to completion.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{watch, RwLock};

use tilemap_viewer::error::FetchError;
use tilemap_viewer::fetch::{BatchStatus, FetchCoordinator, TileFetcher};
use tilemap_viewer::tile::{TileCache, TileKey};
use tilemap_viewer::view::{Frame, MapSession, Renderer, TickOutcome};

/// Poll period used by the helpers.
pub const TICK: Duration = Duration::from_millis(5);

/// Upper bound on polls before a helper gives up.
const MAX_POLLS: usize = 2000;

// =============================================================================
// Mock Tile Fetcher
// =============================================================================

/// Payload whose stride-16 digest is unique per key.
pub fn tile_payload(key: &TileKey) -> Bytes {
    let mut header = vec![key.zoom as u8];
    header.extend_from_slice(&key.row.to_le_bytes());
    header.extend_from_slice(&key.col.to_le_bytes());

    let payload: Vec<u8> = header
        .iter()
        .flat_map(|byte| std::iter::repeat(*byte).take(16))
        .collect();
    Bytes::from(payload)
}

/// A mock fetcher that records every request.
///
/// Keys can be made to fail or to block until [`release`](Self::release) is
/// called. In placeholder mode every key returns the same bytes.
pub struct MockTileFetcher {
    request_count: AtomicUsize,
    requests: RwLock<Vec<TileKey>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    failing: HashSet<TileKey>,
    gated: HashSet<TileKey>,
    gate: watch::Sender<bool>,
    placeholder: Option<Bytes>,
}

impl MockTileFetcher {
    pub fn new() -> Self {
        let (gate, _) = watch::channel(false);
        Self {
            request_count: AtomicUsize::new(0),
            requests: RwLock::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            failing: HashSet::new(),
            gated: HashSet::new(),
            gate,
            placeholder: None,
        }
    }

    pub fn failing(mut self, keys: impl IntoIterator<Item = TileKey>) -> Self {
        self.failing.extend(keys);
        self
    }

    pub fn gated(mut self, keys: impl IntoIterator<Item = TileKey>) -> Self {
        self.gated.extend(keys);
        self
    }

    /// Every request returns the same bytes, like a server past its coverage.
    pub fn placeholder(mut self) -> Self {
        self.placeholder = Some(Bytes::from(vec![0xAB; 256]));
        self
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Let gated requests proceed.
    pub fn release(&self) {
        self.gate.send_replace(true);
    }

    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub async fn requests(&self) -> Vec<TileKey> {
        self.requests.read().await.clone()
    }
}

#[async_trait]
impl TileFetcher for MockTileFetcher {
    async fn fetch(&self, key: &TileKey) -> Result<Bytes, FetchError> {
        self.request_count.fetch_add(1, Ordering::SeqCst);
        self.requests.write().await.push(*key);

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if self.gated.contains(key) {
            let mut open = self.gate.subscribe();
            let _ = open.wait_for(|open| *open).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing.contains(key) {
            return Err(FetchError::Status {
                status: 503,
                url: format!("mock://{}", key),
            });
        }
        Ok(self
            .placeholder
            .clone()
            .unwrap_or_else(|| tile_payload(key)))
    }
}

// =============================================================================
// Recording Renderer
// =============================================================================

/// Keeps every frame it is asked to draw.
#[derive(Default)]
pub struct RecordingRenderer {
    pub frames: Vec<Frame>,
}

impl Renderer for RecordingRenderer {
    fn draw(&mut self, frame: &Frame) {
        self.frames.push(frame.clone());
    }
}

// =============================================================================
// Drivers
// =============================================================================

/// Poll the coordinator until its current batch completes.
pub async fn drain<F: TileFetcher + 'static>(
    coordinator: &mut FetchCoordinator<F>,
    cache: &mut TileCache,
) -> BatchStatus {
    for _ in 0..MAX_POLLS {
        let status = coordinator.poll(cache).expect("no batch started");
        assert!(status.completed <= status.total);
        if status.is_complete() {
            return status;
        }
        tokio::time::sleep(TICK).await;
    }
    panic!("batch did not complete");
}

/// Tick the session until the pending refresh is drawn or skipped.
pub async fn settle<F: TileFetcher + 'static>(
    session: &mut MapSession<F>,
    renderer: &mut RecordingRenderer,
) -> TickOutcome {
    for _ in 0..MAX_POLLS {
        match session.tick(Instant::now(), renderer) {
            TickOutcome::Pending { completed, total } => {
                assert!(completed <= total);
                tokio::time::sleep(TICK).await;
            }
            other => return other,
        }
    }
    panic!("session did not settle");
}
