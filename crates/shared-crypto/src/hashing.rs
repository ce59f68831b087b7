//! # SHA-256 Hashing
//!
//! Domain-separated SHA-256 used for head chaining, body checksums and
//! council seeding. Variable-length inputs are length-prefixed so that
//! concatenations cannot collide.

use sha2::{Digest, Sha256};

/// SHA-256 output (256-bit).
pub type Hash = [u8; 32];

/// Stateful SHA-256 hasher with length-prefixed framing helpers.
#[derive(Clone)]
pub struct Sha256Hasher {
    inner: Sha256,
}

impl Sha256Hasher {
    /// Create new hasher.
    pub fn new() -> Self {
        Self {
            inner: Sha256::new(),
        }
    }

    /// Create a hasher pre-fed with a domain tag.
    pub fn with_domain(domain: &[u8]) -> Self {
        let mut hasher = Self::new();
        hasher.update(domain);
        hasher
    }

    /// Update with raw data.
    pub fn update(&mut self, data: &[u8]) -> &mut Self {
        self.inner.update(data);
        self
    }

    /// Update with `len(data)` as little-endian u64, then `data`.
    pub fn update_framed(&mut self, data: &[u8]) -> &mut Self {
        self.update_u64(data.len() as u64);
        self.inner.update(data);
        self
    }

    /// Update with a little-endian u64.
    pub fn update_u64(&mut self, value: u64) -> &mut Self {
        self.inner.update(value.to_le_bytes());
        self
    }

    /// Finalize and return hash.
    pub fn finalize(self) -> Hash {
        self.inner.finalize().into()
    }
}

impl Default for Sha256Hasher {
    fn default() -> Self {
        Self::new()
    }
}

/// Hash data with SHA-256 (one-shot).
pub fn sha256(data: &[u8]) -> Hash {
    Sha256::digest(data).into()
}
