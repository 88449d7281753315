//! Fetch batches.
//!
//! A batch is the set of jobs launched for one viewport refresh. Jobs keep
//! request order; completion order is arbitrary. Keys found in the cache
//! snapshot taken at batch start are settled immediately as
//! [`JobOutcome::CachedSkip`] and never reach the fetcher.

use std::collections::HashSet;
use std::fmt;

use bytes::Bytes;

use crate::error::FetchError;
use crate::tile::{SampleDigest, TileKey};

/// Identifies a batch. Ids increase monotonically per coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BatchId(pub(crate) u64);

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Result of one job.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    /// Still in flight
    Pending,

    /// Fetched from the source
    Success { payload: Bytes, digest: SampleDigest },

    /// Was already cached when the batch started
    CachedSkip,

    /// Fetch failed; the tile is left blank
    Failed(FetchError),
}

impl JobOutcome {
    pub fn is_settled(&self) -> bool {
        !matches!(self, JobOutcome::Pending)
    }
}

/// One tile request within a batch.
#[derive(Debug, Clone)]
pub struct FetchJob {
    pub key: TileKey,
    pub outcome: JobOutcome,
}

/// Jobs for one viewport refresh plus progress counters.
///
/// `completed` counts settled jobs of any outcome and never exceeds `total`.
#[derive(Debug)]
pub struct FetchBatch {
    id: BatchId,
    jobs: Vec<FetchJob>,
    completed: usize,
}

impl FetchBatch {
    /// Build a batch for `keys` against a cache snapshot.
    ///
    /// Duplicate keys are dropped, keeping the first occurrence.
    pub fn new<I>(id: BatchId, keys: I, cached: &HashSet<TileKey>) -> Self
    where
        I: IntoIterator<Item = TileKey>,
    {
        let mut seen = HashSet::new();
        let mut jobs = Vec::new();
        let mut completed = 0;

        for key in keys {
            if !seen.insert(key) {
                continue;
            }
            let outcome = if cached.contains(&key) {
                completed += 1;
                JobOutcome::CachedSkip
            } else {
                JobOutcome::Pending
            };
            jobs.push(FetchJob { key, outcome });
        }

        Self {
            id,
            jobs,
            completed,
        }
    }

    pub fn id(&self) -> BatchId {
        self.id
    }

    /// Jobs in request order.
    pub fn jobs(&self) -> &[FetchJob] {
        &self.jobs
    }

    pub fn total(&self) -> usize {
        self.jobs.len()
    }

    pub fn completed(&self) -> usize {
        self.completed
    }

    /// Fraction of settled jobs in `[0, 1]`. An empty batch is complete.
    pub fn progress(&self) -> f64 {
        if self.jobs.is_empty() {
            1.0
        } else {
            self.completed as f64 / self.jobs.len() as f64
        }
    }

    pub fn is_complete(&self) -> bool {
        self.completed == self.jobs.len()
    }

    /// Jobs that still need the fetcher, with their indices.
    pub fn pending(&self) -> impl Iterator<Item = (usize, TileKey)> + '_ {
        self.jobs
            .iter()
            .enumerate()
            .filter(|(_, job)| !job.outcome.is_settled())
            .map(|(index, job)| (index, job.key))
    }

    /// Record the outcome of job `index`.
    ///
    /// Returns `false` (and changes nothing) if the index is unknown or the
    /// job already settled, so a job is counted at most once.
    pub fn settle(&mut self, index: usize, outcome: JobOutcome) -> bool {
        debug_assert!(outcome.is_settled());
        match self.jobs.get_mut(index) {
            Some(job) if !job.outcome.is_settled() => {
                job.outcome = outcome;
                self.completed += 1;
                true
            }
            _ => false,
        }
    }

    /// Digests of tiles fetched fresh by this batch, in request order.
    pub fn fresh_digests(&self) -> impl Iterator<Item = &SampleDigest> + '_ {
        self.jobs.iter().filter_map(|job| match &job.outcome {
            JobOutcome::Success { digest, .. } => Some(digest),
            _ => None,
        })
    }

    /// Counts of (fetched, skipped, failed) jobs.
    pub fn tally(&self) -> BatchTally {
        let mut tally = BatchTally::default();
        for job in &self.jobs {
            match &job.outcome {
                JobOutcome::Pending => tally.pending += 1,
                JobOutcome::Success { payload, .. } => {
                    tally.fetched += 1;
                    tally.bytes += payload.len() as u64;
                }
                JobOutcome::CachedSkip => tally.skipped += 1,
                JobOutcome::Failed(_) => tally.failed += 1,
            }
        }
        tally
    }
}

/// Outcome counts for a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct BatchTally {
    pub fetched: usize,
    pub skipped: usize,
    pub failed: usize,
    pub pending: usize,

    /// Bytes of freshly fetched payloads
    pub bytes: u64,
}
