//! Viewer orchestration: staleness checks, drawing and the session loop.

mod render;
mod session;
mod staleness;

pub use render::{tile_origin, Frame, LogRenderer, Renderer};
pub use session::{MapSession, TickOutcome};
pub use staleness::{StalenessDetector, DEFAULT_MATCH_THRESHOLD, DEFAULT_SAMPLE_CAP};
