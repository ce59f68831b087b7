//! The append-only Body and its checksum.

use crate::error::LedgerResult;
use serde::{Deserialize, Serialize};
use shared_crypto::Sha256Hasher;
use shared_types::{EpochId, Hash, MatchRecord};

const BODY_DOMAIN: &[u8] = b"ml-body-v1";

/// Digest over an ordered match list, independent of the head chain.
pub fn body_checksum(matches: &[MatchRecord]) -> LedgerResult<Hash> {
    let mut hasher = Sha256Hasher::with_domain(BODY_DOMAIN);
    hasher.update_u64(matches.len() as u64);
    for record in matches {
        hasher.update_framed(&record.encode()?);
    }
    Ok(hasher.finalize())
}

/// Full match log of the current epoch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Body {
    pub epoch_id: EpochId,
    pub matches: Vec<MatchRecord>,
    /// Sum of the encoded sizes of `matches`.
    pub total_size: u64,
}

impl Body {
    pub fn new(epoch_id: EpochId) -> Self {
        Self {
            epoch_id,
            matches: Vec::new(),
            total_size: 0,
        }
    }

    /// Append a record. Fails without mutating if it cannot be encoded.
    pub fn append(&mut self, record: MatchRecord) -> LedgerResult<()> {
        let size = record.encoded_len()?;
        self.matches.push(record);
        self.total_size += size;
        Ok(())
    }

    pub fn checksum(&self) -> LedgerResult<Hash> {
        body_checksum(&self.matches)
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::PeerId;

    fn record(id: &str) -> MatchRecord {
        MatchRecord::new(id, "lvl", vec!["a".into()], 0, 1_000, PeerId([1u8; 32])).sealed().unwrap()
    }

    #[test]
    fn test_append_tracks_size() {
        let mut body = Body::new(EpochId::parse("2025-01-01").unwrap());
        let r = record("m1");
        let expected = r.encoded_len().unwrap();
        body.append(r).unwrap();

        assert_eq!(body.len(), 1);
        assert_eq!(body.total_size, expected);
    }

    #[test]
    fn test_checksum_depends_on_order_and_content() {
        let a = vec![record("m1"), record("m2")];
        let b = vec![record("m2"), record("m1")];
        assert_ne!(body_checksum(&a).unwrap(), body_checksum(&b).unwrap());
        assert_eq!(body_checksum(&a).unwrap(), body_checksum(&a.clone()).unwrap());
    }

    #[test]
    fn test_empty_body_checksum_is_stable() {
        assert_eq!(body_checksum(&[]).unwrap(), body_checksum(&[]).unwrap());
    }
}
