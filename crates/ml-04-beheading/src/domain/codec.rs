//! # Morgue Codec
//!
//! Archived bodies are stored as `[format][zstd(bincode(Vec<MatchRecord>))]`.
//!
//! - **Write Path**: `bincode` → `zstd::encode_all(level)` → prefix format byte
//! - **Read Path**: check format byte → `zstd::decode_all` → `bincode`

use crate::error::{BeheadingError, FinalizationResult};
use shared_types::MatchRecord;

/// Current archive body format.
pub const MORGUE_FORMAT_V1: u8 = 1;

/// Default zstd level (1-22). 3 is zstd's own default.
pub const DEFAULT_COMPRESSION_LEVEL: i32 = 3;

/// Encoded body plus its uncompressed size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedBody {
    pub bytes: Vec<u8>,
    pub raw_size: u64,
}

/// Compresses match lists for the morgue and restores them on demand.
#[derive(Debug, Clone, Copy)]
pub struct MorgueCodec {
    level: i32,
}

impl Default for MorgueCodec {
    fn default() -> Self {
        Self::new(DEFAULT_COMPRESSION_LEVEL)
    }
}

impl MorgueCodec {
    /// Levels outside 1-22 are clamped.
    pub fn new(level: i32) -> Self {
        Self {
            level: level.clamp(1, 22),
        }
    }

    pub fn level(&self) -> i32 {
        self.level
    }

    pub fn encode(&self, matches: &[MatchRecord]) -> FinalizationResult<EncodedBody> {
        let raw = bincode::serialize(matches)
            .map_err(|e| BeheadingError::Codec(format!("encode failed: {e}")))?;
        let compressed = zstd::encode_all(raw.as_slice(), self.level)
            .map_err(|e| BeheadingError::Codec(format!("compression failed: {e}")))?;

        let mut bytes = Vec::with_capacity(compressed.len() + 1);
        bytes.push(MORGUE_FORMAT_V1);
        bytes.extend_from_slice(&compressed);
        Ok(EncodedBody {
            bytes,
            raw_size: raw.len() as u64,
        })
    }

    pub fn decode(&self, bytes: &[u8]) -> FinalizationResult<Vec<MatchRecord>> {
        let (format, compressed) = bytes
            .split_first()
            .ok_or_else(|| BeheadingError::Codec("empty archive body".to_string()))?;
        if *format != MORGUE_FORMAT_V1 {
            return Err(BeheadingError::Codec(format!(
                "unknown archive format {format}"
            )));
        }
        let raw = zstd::decode_all(compressed)
            .map_err(|e| BeheadingError::Codec(format!("decompression failed: {e}")))?;
        bincode::deserialize(&raw).map_err(|e| BeheadingError::Codec(format!("decode failed: {e}")))
    }
}
