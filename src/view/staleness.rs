//! Degenerate-imagery detection.
//!
//! Tile servers answer requests past their deepest coverage with the same
//! placeholder image for every tile. A completed batch whose fresh tiles all
//! sample alike is treated as that placeholder and not drawn.

use crate::fetch::FetchBatch;

/// Fresh digests compared, counting the reference one.
pub const DEFAULT_SAMPLE_CAP: usize = 4;

/// Matches against the reference digest needed to call a batch degenerate.
/// The comparison is strictly greater-than.
pub const DEFAULT_MATCH_THRESHOLD: usize = 1;

/// Decides whether a completed batch returned placeholder imagery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StalenessDetector {
    sample_cap: usize,
    match_threshold: usize,
}

impl StalenessDetector {
    pub fn new(sample_cap: usize, match_threshold: usize) -> Self {
        Self {
            sample_cap,
            match_threshold,
        }
    }

    /// `true` if the batch is complete, fetched at least two tiles fresh,
    /// and more than `match_threshold` of fresh tiles 2..=`sample_cap`
    /// share the first fresh tile's digest.
    ///
    /// Cached skips are excluded: tiles that were already resident say
    /// nothing about what the server is returning now.
    pub fn is_degenerate(&self, batch: &FetchBatch) -> bool {
        if !batch.is_complete() {
            return false;
        }

        let fresh: Vec<_> = batch.fresh_digests().take(self.sample_cap).collect();
        let Some((first, rest)) = fresh.split_first() else {
            return false;
        };
        if rest.is_empty() {
            return false;
        }

        let matches = rest.iter().filter(|d| **d == *first).count();
        matches > self.match_threshold
    }
}

impl Default for StalenessDetector {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_CAP, DEFAULT_MATCH_THRESHOLD)
    }
}
