//! On-disk tile store.
//!
//! Layout: one directory per zoom level, one file per tile named
//! `<row>-<col>.<extension>`. The extension is fixed per store and names the
//! source image format; payloads are written byte-for-byte, never re-encoded.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::FetchError;
use crate::tile::TileKey;

use super::TileFetcher;

/// Default file extension for persisted tiles.
pub const DEFAULT_TILE_EXTENSION: &str = "jpg";

/// Directory-per-zoom tile store rooted at a local path.
#[derive(Debug, Clone)]
pub struct DiskTileStore {
    root: PathBuf,
    extension: String,
}

impl DiskTileStore {
    /// Create a store rooted at `root` using the default extension.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_extension(root, DEFAULT_TILE_EXTENSION)
    }

    pub fn with_extension(root: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            extension: extension.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Full path of the file holding `key`.
    pub fn path_for(&self, key: &TileKey) -> PathBuf {
        self.root.join(key.relative_path(&self.extension))
    }

    /// Create the directory for a zoom level if it does not exist yet.
    pub async fn ensure_zoom_dir(&self, zoom: u32) -> Result<(), FetchError> {
        tokio::fs::create_dir_all(self.root.join(zoom.to_string())).await?;
        Ok(())
    }

    /// Write a tile payload, creating its zoom directory as needed.
    pub async fn write(&self, key: &TileKey, payload: &[u8]) -> Result<(), FetchError> {
        self.ensure_zoom_dir(key.zoom).await?;
        tokio::fs::write(self.path_for(key), payload).await?;
        Ok(())
    }

    /// Read a persisted tile. Returns `Ok(None)` if it was never written.
    pub async fn read(&self, key: &TileKey) -> Result<Option<Bytes>, FetchError> {
        match tokio::fs::read(self.path_for(key)).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Serve tiles from a previously populated store (offline viewing).
#[async_trait]
impl TileFetcher for DiskTileStore {
    async fn fetch(&self, key: &TileKey) -> Result<Bytes, FetchError> {
        self.read(key).await?.ok_or_else(|| {
            FetchError::Io(format!("tile {} not found under {}", key, self.root.display()))
        })
    }
}
