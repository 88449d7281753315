//! Viewport state machine.
//!
//! Holds the current zoom and tile window and decides which input events
//! produce a new window. Scroll zoom is debounced:
//!
//! ```text
//!              scroll (gate open)
//!   ┌──────┐ ─────────────────────▶ ┌────────┐
//!   │ Open │                        │ Closed │ ◀── scroll: queue, restart timer
//!   └──────┘ ◀───────────────────── └────────┘
//!              tick past deadline
//!              (flush queued scrolls)
//! ```
//!
//! Click zoom and pan apply immediately while the gate is open. A click
//! arriving while it is closed is dropped.
//!
//! Time is passed in explicitly so the host's timer (or a test) drives the
//! settle deadline.

use std::time::{Duration, Instant};

use tracing::debug;

use crate::tile::{Anchor, TileCoordinateSystem, TileWindow};

/// Quiet period after a scroll zoom before the gate reopens.
pub const DEFAULT_SETTLE_INTERVAL: Duration = Duration::from_millis(1000);

/// Zoom step direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoomDirection {
    In,
    Out,
}

impl ZoomDirection {
    fn step(self) -> i64 {
        match self {
            ZoomDirection::In => 1,
            ZoomDirection::Out => -1,
        }
    }
}

/// One zoom request anchored at a point of the viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomCommand {
    pub anchor: Anchor,
    pub direction: ZoomDirection,
}

impl ZoomCommand {
    /// Command anchored at normalised viewport coordinates.
    pub fn new(anchor_x: f64, anchor_y: f64, direction: ZoomDirection) -> Self {
        Self {
            anchor: Anchor::new(anchor_x, anchor_y),
            direction,
        }
    }

    pub fn centered(direction: ZoomDirection) -> Self {
        Self {
            anchor: Anchor::CENTER,
            direction,
        }
    }
}

/// Current zoom and window plus the scroll-zoom gate.
#[derive(Debug, Clone)]
pub struct ViewportState {
    coords: TileCoordinateSystem,
    window: TileWindow,
    gate_open: bool,
    settle_interval: Duration,
    settle_deadline: Option<Instant>,
    queued: Vec<ZoomCommand>,
}

impl ViewportState {
    /// Start at `initial_zoom` (clamped into the coordinate system's range)
    /// centred on the grid.
    pub fn new(coords: TileCoordinateSystem, initial_zoom: u32) -> Self {
        Self::with_settle_interval(coords, initial_zoom, DEFAULT_SETTLE_INTERVAL)
    }

    pub fn with_settle_interval(
        coords: TileCoordinateSystem,
        initial_zoom: u32,
        settle_interval: Duration,
    ) -> Self {
        Self {
            window: coords.initial_window(initial_zoom),
            coords,
            gate_open: true,
            settle_interval,
            settle_deadline: None,
            queued: Vec::new(),
        }
    }

    pub fn zoom(&self) -> u32 {
        self.window.zoom
    }

    pub fn window(&self) -> &TileWindow {
        &self.window
    }

    pub fn coords(&self) -> &TileCoordinateSystem {
        &self.coords
    }

    pub fn is_zoom_gate_open(&self) -> bool {
        self.gate_open
    }

    /// Scroll commands waiting for the gate to reopen.
    pub fn queued_scrolls(&self) -> usize {
        self.queued.len()
    }

    /// Zoom one level around the command's anchor.
    ///
    /// Returns the new window, or `None` if the gate is closed or the zoom
    /// would leave the configured range.
    pub fn click_zoom(&mut self, cmd: ZoomCommand) -> Option<TileWindow> {
        if !self.gate_open {
            debug!(zoom = self.zoom(), "Click zoom ignored while zoom is settling");
            return None;
        }
        self.step_zoom(cmd.anchor, cmd.direction.step())
    }

    /// Scroll-wheel zoom.
    ///
    /// With the gate open the zoom applies now and the gate closes until
    /// `now + settle_interval`. With the gate closed the command is queued
    /// and the deadline is pushed back.
    pub fn scroll_zoom(&mut self, cmd: ZoomCommand, now: Instant) -> Option<TileWindow> {
        self.settle_deadline = Some(now + self.settle_interval);

        if !self.gate_open {
            self.queued.push(cmd);
            debug!(queued = self.queued.len(), "Scroll zoom queued");
            return None;
        }

        self.gate_open = false;
        self.step_zoom(cmd.anchor, cmd.direction.step())
    }

    /// Advance the settle timer.
    ///
    /// Once `now` reaches the deadline the gate reopens and queued scrolls
    /// are applied as a single step in their net direction, anchored where
    /// the last one was. Returns the window if that step moved it.
    pub fn tick(&mut self, now: Instant) -> Option<TileWindow> {
        match self.settle_deadline {
            Some(deadline) if now >= deadline => {}
            _ => return None,
        }

        self.settle_deadline = None;
        self.gate_open = true;

        let queued = std::mem::take(&mut self.queued);
        let last = queued.last()?;
        let net: i64 = queued.iter().map(|cmd| cmd.direction.step()).sum();
        debug!(queued = queued.len(), net, "Zoom settled");

        if net == 0 {
            return None;
        }
        self.step_zoom(last.anchor, net.signum())
    }

    /// Shift the window by whole tiles. Allowed regardless of the zoom gate.
    pub fn pan_by(&mut self, dx: i64, dy: i64) -> Option<TileWindow> {
        let panned = self.coords.pan(&self.window, dx, dy);
        if panned == self.window {
            return None;
        }
        self.window = panned;
        Some(panned)
    }

    /// The window to refetch on reload. Geometry is unchanged.
    pub fn reload(&self) -> TileWindow {
        self.window
    }

    fn step_zoom(&mut self, anchor: Anchor, step: i64) -> Option<TileWindow> {
        let target = i64::from(self.zoom()) + step;
        if target < i64::from(self.coords.min_zoom()) || target > i64::from(self.coords.max_zoom()) {
            debug!(zoom = self.zoom(), requested = target, "Zoom outside configured range");
            return None;
        }

        let next = self
            .coords
            .window_after_zoom(&self.window, target as u32, anchor);
        if next == self.window {
            return None;
        }

        debug!(from = self.zoom(), to = next.zoom, "Zoom");
        self.window = next;
        Some(next)
    }
}
