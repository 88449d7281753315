//! Fetch coordination.
//!
//! # Execution model
//!
//! ```text
//!   control thread                         tokio workers
//!  ┌─────────────────────────┐           ┌──────────────────────┐
//!  │ start_batch(keys, ...)  │──spawn───▶│ permit ─▶ fetch(key) │
//!  │                         │           └──────────┬───────────┘
//!  │ poll(&mut cache)        │◀──JobReport (mpsc)───┘
//!  │   fold into cache       │
//!  │   settle current batch  │
//!  └─────────────────────────┘
//! ```
//!
//! Workers never touch the cache or the batch. Each job sends exactly one
//! report carrying `(batch id, job index, key, result)`; the control thread
//! drains reports in [`FetchCoordinator::poll`], which never blocks. Reports
//! for a superseded batch still populate the cache but leave the current
//! batch's counters alone.
//!
//! All batches share one worker pool. Superseded jobs keep their permits
//! until they finish, so a burst of pans or zooms never puts more than
//! [`FetchCoordinator::workers`] fetches in flight.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, warn};

use crate::error::FetchError;
use crate::tile::{SampleDigest, TileCache, TileKey};

use super::batch::{BatchId, FetchBatch, JobOutcome};
use super::TileFetcher;

/// Smallest worker pool the coordinator runs with.
pub const MIN_WORKERS: usize = 4;

/// Worker pool size for a requested concurrency.
pub fn pool_size(concurrency: usize) -> usize {
    concurrency.max(MIN_WORKERS)
}

/// Message from a worker back to the control thread.
#[derive(Debug)]
struct JobReport {
    batch: BatchId,
    index: usize,
    key: TileKey,
    result: Result<Bytes, FetchError>,
}

/// Progress snapshot of the current batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchStatus {
    pub id: BatchId,
    pub completed: usize,
    pub total: usize,
}

impl BatchStatus {
    pub fn is_complete(&self) -> bool {
        self.completed == self.total
    }
}

/// Launches fetch batches and folds their results into a [`TileCache`].
///
/// Must be used from within a tokio runtime: `start_batch` spawns tasks.
pub struct FetchCoordinator<F> {
    fetcher: Arc<F>,
    reports_tx: mpsc::UnboundedSender<JobReport>,
    reports_rx: mpsc::UnboundedReceiver<JobReport>,
    current: Option<FetchBatch>,
    next_id: u64,
    permits: Arc<Semaphore>,
    workers: usize,
}

impl<F: TileFetcher + 'static> FetchCoordinator<F> {
    pub fn new(fetcher: F) -> Self {
        Self::from_arc(Arc::new(fetcher))
    }

    /// Share a fetcher that the caller also keeps a handle to.
    pub fn from_arc(fetcher: Arc<F>) -> Self {
        let (reports_tx, reports_rx) = mpsc::unbounded_channel();
        Self {
            fetcher,
            reports_tx,
            reports_rx,
            current: None,
            next_id: 1,
            permits: Arc::new(Semaphore::new(MIN_WORKERS)),
            workers: MIN_WORKERS,
        }
    }

    /// Size of the shared worker pool.
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Grow the shared pool to `pool_size(concurrency)`. Never shrinks.
    fn ensure_workers(&mut self, concurrency: usize) {
        let wanted = pool_size(concurrency);
        if wanted > self.workers {
            self.permits.add_permits(wanted - self.workers);
            debug!(from = self.workers, to = wanted, "Growing fetch worker pool");
            self.workers = wanted;
        }
    }

    pub fn fetcher(&self) -> &Arc<F> {
        &self.fetcher
    }

    /// The most recently started batch.
    pub fn current(&self) -> Option<&FetchBatch> {
        self.current.as_ref()
    }

    pub fn status(&self) -> Option<BatchStatus> {
        self.current.as_ref().map(|batch| BatchStatus {
            id: batch.id(),
            completed: batch.completed(),
            total: batch.total(),
        })
    }

    /// Start a batch for `keys`, superseding any batch in progress.
    ///
    /// Keys resident in `cache` at this moment are settled as cached skips
    /// and never fetched. The remaining keys are fetched on the shared pool,
    /// which is grown to `max(4, concurrency)` workers if smaller. Superseded
    /// jobs keep running and their payloads still reach the cache through
    /// [`poll`](Self::poll).
    pub fn start_batch<I>(&mut self, keys: I, concurrency: usize, cache: &TileCache) -> BatchId
    where
        I: IntoIterator<Item = TileKey>,
    {
        let snapshot: HashSet<TileKey> = cache.snapshot_keys();
        self.start_with_snapshot(keys, concurrency, &snapshot)
    }

    fn start_with_snapshot<I>(
        &mut self,
        keys: I,
        concurrency: usize,
        snapshot: &HashSet<TileKey>,
    ) -> BatchId
    where
        I: IntoIterator<Item = TileKey>,
    {
        let id = BatchId(self.next_id);
        self.next_id += 1;

        if let Some(previous) = self.current.as_ref().filter(|b| !b.is_complete()) {
            debug!(
                superseded = %previous.id(),
                by = %id,
                completed = previous.completed(),
                total = previous.total(),
                "Superseding unfinished fetch batch"
            );
        }

        self.ensure_workers(concurrency);
        let batch = FetchBatch::new(id, keys, snapshot);

        debug!(
            batch = %id,
            total = batch.total(),
            cached = batch.completed(),
            workers = self.workers,
            "Starting fetch batch"
        );

        for (index, key) in batch.pending() {
            let fetcher = Arc::clone(&self.fetcher);
            let permits = Arc::clone(&self.permits);
            let tx = self.reports_tx.clone();

            tokio::spawn(async move {
                let result = match permits.acquire_owned().await {
                    Ok(_permit) => {
                        // Run the fetch in its own task so a panicking
                        // fetcher still produces a report.
                        let job = tokio::spawn(async move { fetcher.fetch(&key).await });
                        match job.await {
                            Ok(result) => result,
                            Err(e) => Err(FetchError::Task(e.to_string())),
                        }
                    }
                    Err(e) => Err(FetchError::Task(e.to_string())),
                };

                // The receiver lives as long as the coordinator.
                let _ = tx.send(JobReport {
                    batch: id,
                    index,
                    key,
                    result,
                });
            });
        }

        self.current = Some(batch);
        id
    }

    /// Drain finished jobs without blocking.
    ///
    /// Every successful payload is stored in `cache`, whichever batch it
    /// belongs to. Only reports for the current batch advance its progress.
    pub fn poll(&mut self, cache: &mut TileCache) -> Option<BatchStatus> {
        while let Ok(report) = self.reports_rx.try_recv() {
            self.fold(report, cache);
        }
        self.status()
    }

    fn fold(&mut self, report: JobReport, cache: &mut TileCache) {
        let JobReport {
            batch,
            index,
            key,
            result,
        } = report;

        let outcome = match result {
            Ok(payload) => {
                let digest = SampleDigest::of(&payload);
                cache.put(key, payload.clone(), digest.clone());
                JobOutcome::Success { payload, digest }
            }
            Err(e) => {
                warn!(key = %key, batch = %batch, error = %e, "Tile fetch failed");
                JobOutcome::Failed(e)
            }
        };

        match self.current.as_mut() {
            Some(current) if current.id() == batch => {
                if current.settle(index, outcome) {
                    debug!(
                        batch = %batch,
                        key = %key,
                        completed = current.completed(),
                        total = current.total(),
                        "Fetch progress"
                    );
                }
            }
            _ => {
                debug!(batch = %batch, key = %key, "Late result from superseded batch");
            }
        }
    }

    /// Poll every `interval` until the current batch completes.
    ///
    /// For hosts without their own event loop (the batch pre-fetcher).
    pub async fn drive_to_completion(
        &mut self,
        cache: &mut TileCache,
        interval: Duration,
    ) -> Option<BatchStatus> {
        loop {
            match self.poll(cache) {
                Some(status) if !status.is_complete() => tokio::time::sleep(interval).await,
                other => return other,
            }
        }
    }
}
