//! Interactive viewer session.
//!
//! # Refresh cycle
//!
//! ```text
//!  input ──▶ ViewportState ──new window──▶ FetchCoordinator::start_batch
//!                                                   │
//!  tick ──▶ ViewportState::tick (settle)            │ workers
//!       └─▶ FetchCoordinator::poll ◀────────────────┘
//!             │ batch complete
//!             ▼
//!        StalenessDetector ──degenerate──▶ keep previous frame
//!             │ ok
//!             ▼
//!        Renderer::draw(cached tiles of the window)
//! ```
//!
//! All state lives on the caller's thread. The host calls [`MapSession::tick`]
//! on a timer; nothing here blocks.

use std::time::Instant;

use tracing::{debug, info};

use crate::fetch::{BatchId, FetchCoordinator, TileFetcher};
use crate::tile::{TileCache, TileWindow};
use crate::viewport::{ViewportGeometry, ViewportState, ZoomCommand};

use super::render::{Frame, Renderer};
use super::staleness::StalenessDetector;

/// What a tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// No refresh waiting to be drawn
    Idle,

    /// The current batch is still running
    Pending { completed: usize, total: usize },

    /// The window was drawn
    Rendered { drawn: usize, missing: usize },

    /// The batch returned placeholder imagery; nothing was drawn
    SkippedDegenerate,
}

/// A viewer: viewport, cache and fetch pipeline driven by one control loop.
pub struct MapSession<F> {
    viewport: ViewportState,
    cache: TileCache,
    coordinator: FetchCoordinator<F>,
    detector: StalenessDetector,
    geometry: ViewportGeometry,
    concurrency: usize,
    awaiting_draw: bool,
}

impl<F: TileFetcher + 'static> MapSession<F> {
    pub fn new(
        viewport: ViewportState,
        geometry: ViewportGeometry,
        cache: TileCache,
        coordinator: FetchCoordinator<F>,
        concurrency: usize,
    ) -> Self {
        Self {
            viewport,
            cache,
            coordinator,
            detector: StalenessDetector::default(),
            geometry,
            concurrency,
            awaiting_draw: false,
        }
    }

    pub fn with_detector(mut self, detector: StalenessDetector) -> Self {
        self.detector = detector;
        self
    }

    pub fn viewport(&self) -> &ViewportState {
        &self.viewport
    }

    pub fn cache(&self) -> &TileCache {
        &self.cache
    }

    pub fn coordinator(&self) -> &FetchCoordinator<F> {
        &self.coordinator
    }

    /// Fetch the initial window.
    pub fn start(&mut self) -> BatchId {
        self.refresh()
    }

    pub fn click_zoom(&mut self, cmd: ZoomCommand) -> Option<BatchId> {
        self.viewport.click_zoom(cmd).map(|_| self.refresh())
    }

    pub fn scroll_zoom(&mut self, cmd: ZoomCommand, now: Instant) -> Option<BatchId> {
        self.viewport.scroll_zoom(cmd, now).map(|_| self.refresh())
    }

    pub fn pan_by(&mut self, dx: i64, dy: i64) -> Option<BatchId> {
        self.viewport.pan_by(dx, dy).map(|_| self.refresh())
    }

    /// Refetch the current window. Cached tiles are skipped as usual.
    pub fn reload(&mut self) -> BatchId {
        self.viewport.reload();
        self.refresh()
    }

    /// Advance timers, fold fetch results and draw when a batch completes.
    pub fn tick<R: Renderer>(&mut self, now: Instant, renderer: &mut R) -> TickOutcome {
        if self.viewport.tick(now).is_some() {
            self.refresh();
        }

        let status = self.coordinator.poll(&mut self.cache);
        if !self.awaiting_draw {
            return TickOutcome::Idle;
        }

        let Some(status) = status else {
            return TickOutcome::Idle;
        };
        if !status.is_complete() {
            return TickOutcome::Pending {
                completed: status.completed,
                total: status.total,
            };
        }

        self.awaiting_draw = false;
        let degenerate = self
            .coordinator
            .current()
            .is_some_and(|batch| self.detector.is_degenerate(batch));
        if degenerate {
            info!(
                zoom = self.viewport.zoom(),
                "Imagery beyond source coverage, keeping previous frame"
            );
            return TickOutcome::SkippedDegenerate;
        }

        let frame = self.frame();
        renderer.draw(&frame);
        TickOutcome::Rendered {
            drawn: frame.tiles.len(),
            missing: frame.missing(),
        }
    }

    /// Cached tiles of the current window. Each lookup promotes the tile.
    pub fn frame(&mut self) -> Frame {
        let window: TileWindow = *self.viewport.window();
        let tiles = window
            .keys()
            .into_iter()
            .filter_map(|key| self.cache.get(&key).map(|entry| (key, entry.payload)))
            .collect();

        Frame {
            window,
            tile_width: self.geometry.tile_width,
            tile_height: self.geometry.tile_height,
            tiles,
        }
    }

    fn refresh(&mut self) -> BatchId {
        let window = *self.viewport.window();
        debug!(
            zoom = window.zoom,
            x = ?(window.x_start, window.x_end),
            y = ?(window.y_start, window.y_end),
            "Refreshing window"
        );
        self.awaiting_draw = true;
        self.coordinator
            .start_batch(window.keys(), self.concurrency, &self.cache)
    }
}
