//! Recency-ordered cache of fetched tile payloads.
//!
//! # Capacity
//!
//! Capacity is derived from a memory budget as
//! `min(1000, budget / (tile_width * tile_height * 3))`, i.e. the number of
//! decoded RGB tiles the budget can hold, capped at 1000 entries.
//!
//! # Eviction
//!
//! The cache keeps two slots of headroom below its capacity: after an
//! insertion leaves more than `capacity - 2` entries resident, the
//! least-recently-used entry is evicted. Every `get` promotes the entry to
//! most-recently-used, so the entry just touched is never the one evicted.
//!
//! The cache has a single writer (the viewer's control loop) and is not
//! internally synchronised.

use std::collections::HashSet;

use bytes::Bytes;
use lru::LruCache;
use tracing::debug;

use super::digest::SampleDigest;
use super::key::TileKey;

/// Upper bound on cache slots regardless of budget.
pub const MAX_CACHE_ENTRIES: usize = 1000;

/// Slots kept free below capacity before eviction kicks in.
pub const EVICTION_HEADROOM: usize = 2;

/// Default memory budget: 100MB
pub const DEFAULT_MEMORY_BUDGET: usize = 100 * 1024 * 1024;

/// Bytes per decoded pixel assumed when sizing the cache (RGB).
const BYTES_PER_PIXEL: usize = 3;

// =============================================================================
// Cache Entry
// =============================================================================

/// A resident tile: the raw payload and its sampled digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// Tile bytes exactly as fetched
    pub payload: Bytes,

    /// Stride-sampled fingerprint of `payload`
    pub digest: SampleDigest,
}

// =============================================================================
// Tile Cache
// =============================================================================

/// Bounded LRU store of tile payloads keyed by [`TileKey`].
///
/// # Example
///
/// ```
/// use bytes::Bytes;
/// use tilemap_viewer::tile::{SampleDigest, TileCache, TileKey};
///
/// let mut cache = TileCache::with_capacity(10);
/// let key = TileKey::new(3, 1, 2);
/// let payload = Bytes::from_static(b"\xFF\xD8\xFF\xE0");
///
/// cache.put(key, payload.clone(), SampleDigest::of(&payload));
/// assert_eq!(cache.get(&key).map(|e| e.payload), Some(payload));
/// ```
pub struct TileCache {
    /// Entries in recency order
    entries: LruCache<TileKey, CacheEntry>,

    /// Nominal capacity in entries
    capacity: usize,

    /// Sum of resident payload sizes in bytes
    size_bytes: usize,
}

impl TileCache {
    /// Create a cache with the given nominal capacity (in entries).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: LruCache::unbounded(),
            capacity,
            size_bytes: 0,
        }
    }

    /// Create a cache sized for `memory_budget` bytes of `tile_width × tile_height` tiles.
    pub fn for_budget(memory_budget: usize, tile_width: u32, tile_height: u32) -> Self {
        Self::with_capacity(Self::capacity_for_budget(
            memory_budget,
            tile_width,
            tile_height,
        ))
    }

    /// Number of entries a memory budget allows, capped at [`MAX_CACHE_ENTRIES`].
    pub fn capacity_for_budget(memory_budget: usize, tile_width: u32, tile_height: u32) -> usize {
        let tile_bytes = tile_width as usize * tile_height as usize * BYTES_PER_PIXEL;
        memory_budget
            .checked_div(tile_bytes)
            .unwrap_or(0)
            .min(MAX_CACHE_ENTRIES)
    }

    /// Entries allowed to stay resident after an insertion.
    ///
    /// Capacities of 1 and 2 still keep the newest entry; a zero-capacity
    /// cache keeps nothing.
    fn resident_limit(&self) -> usize {
        self.capacity
            .saturating_sub(EVICTION_HEADROOM)
            .max(1)
            .min(self.capacity)
    }

    /// Get a tile, promoting it to most-recently-used.
    pub fn get(&mut self, key: &TileKey) -> Option<CacheEntry> {
        self.entries.get(key).cloned()
    }

    /// Look at a tile without touching its recency.
    pub fn peek(&self, key: &TileKey) -> Option<&CacheEntry> {
        self.entries.peek(key)
    }

    /// Check residency without touching recency.
    pub fn contains(&self, key: &TileKey) -> bool {
        self.entries.contains(key)
    }

    /// Store a tile.
    ///
    /// If `key` is already resident this behaves as [`get`](Self::get): the
    /// existing entry is promoted and returned, the new payload is dropped.
    /// Otherwise the tile is inserted as most-recently-used and, if the cache
    /// now exceeds `capacity - 2` entries, the least-recently-used entry is
    /// evicted.
    pub fn put(&mut self, key: TileKey, payload: Bytes, digest: SampleDigest) -> CacheEntry {
        if let Some(existing) = self.entries.get(&key) {
            return existing.clone();
        }

        let entry = CacheEntry { payload, digest };
        self.size_bytes += entry.payload.len();
        self.entries.put(key, entry.clone());

        let limit = self.resident_limit();
        while self.entries.len() > limit {
            match self.entries.pop_lru() {
                Some((evicted, old)) => {
                    self.size_bytes = self.size_bytes.saturating_sub(old.payload.len());
                    debug!(key = %evicted, "Evicted tile from cache");
                }
                None => break,
            }
        }

        entry
    }

    /// Keys currently resident. Used to build fetch batches without
    /// re-deriving membership while jobs are in flight.
    pub fn snapshot_keys(&self) -> HashSet<TileKey> {
        self.entries.iter().map(|(k, _)| *k).collect()
    }

    /// Resident keys from most- to least-recently-used.
    pub fn recency_order(&self) -> Vec<TileKey> {
        self.entries.iter().map(|(k, _)| *k).collect()
    }

    /// Remove all entries.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.size_bytes = 0;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Nominal capacity in entries.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total bytes of resident payloads.
    pub fn size_bytes(&self) -> usize {
        self.size_bytes
    }
}

impl Default for TileCache {
    fn default() -> Self {
        Self::for_budget(DEFAULT_MEMORY_BUDGET, 256, 256)
    }
}

// =============================================================================
// Tests
// =============================================================================
