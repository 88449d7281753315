use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::FetchError;
use crate::tile::TileKey;

use super::disk::DiskTileStore;

/// Source of raw tile bytes.
///
/// Implementations must be idempotent and safe to call concurrently for
/// distinct keys. No ordering is assumed between calls. Timeouts are the
/// implementation's responsibility.
#[async_trait]
pub trait TileFetcher: Send + Sync {
    /// Fetch the payload of one tile.
    async fn fetch(&self, key: &TileKey) -> Result<Bytes, FetchError>;
}

#[async_trait]
impl<T: TileFetcher + ?Sized> TileFetcher for Arc<T> {
    async fn fetch(&self, key: &TileKey) -> Result<Bytes, FetchError> {
        (**self).fetch(key).await
    }
}

// =============================================================================
// Persisting Fetcher
// =============================================================================

/// Wraps a fetcher so every successful payload is also written to disk.
///
/// A failed write fails the job; the payload is not returned without its
/// on-disk copy.
pub struct PersistingFetcher<F> {
    inner: F,
    store: DiskTileStore,
}

impl<F: TileFetcher> PersistingFetcher<F> {
    pub fn new(inner: F, store: DiskTileStore) -> Self {
        Self { inner, store }
    }

    pub fn store(&self) -> &DiskTileStore {
        &self.store
    }
}

#[async_trait]
impl<F: TileFetcher> TileFetcher for PersistingFetcher<F> {
    async fn fetch(&self, key: &TileKey) -> Result<Bytes, FetchError> {
        let payload = self.inner.fetch(key).await?;
        self.store.write(key, &payload).await?;
        Ok(payload)
    }
}
