//! Stride-sampled payload fingerprints.
//!
//! A digest is every 16th byte of a tile payload. It is cheap to compute and
//! compare, and is used only to spot duplicate imagery across a fetch batch.
//! It carries no integrity guarantee.

use bytes::Bytes;

/// Sampling stride in bytes.
pub const DIGEST_STRIDE: usize = 16;

/// Subsampled byte sequence of a payload, taken at [`DIGEST_STRIDE`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SampleDigest(Bytes);

impl SampleDigest {
    /// Sample `payload` starting at byte 0, every [`DIGEST_STRIDE`] bytes.
    pub fn of(payload: &[u8]) -> Self {
        let sampled: Vec<u8> = payload.iter().step_by(DIGEST_STRIDE).copied().collect();
        Self(Bytes::from(sampled))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
