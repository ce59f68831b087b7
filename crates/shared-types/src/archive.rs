//! # Morgue Records
//!
//! Shapes written to and read from the durable archive of finalized epochs.

use crate::entities::{EpochId, Hash, MorgueId, PeerId, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A finalized epoch as handed to the sink for insertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveRecord {
    pub epoch_id: EpochId,
    pub head_hash: Hash,
    pub previous_head_hash: Option<Hash>,
    pub body_checksum: Hash,
    pub match_count: u64,
    pub total_players: u64,
    pub total_time_played: u64,
    /// Uncompressed Body size in bytes.
    pub body_size: u64,
    /// Encoded and compressed match list.
    pub compressed_body: Vec<u8>,
    pub epoch_created_at: Timestamp,
    pub finalized_at: Timestamp,
}

/// Quorum attestation attached to an archive once it is hard-final.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveAuthentication {
    pub authenticated_by: Vec<PeerId>,
    pub signatures: BTreeMap<PeerId, Vec<u8>>,
    pub authenticated_at: Timestamp,
}

/// An archive as stored by the sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredArchive {
    pub morgue_id: MorgueId,
    pub record: ArchiveRecord,
    pub authentication: Option<ArchiveAuthentication>,
}

impl StoredArchive {
    pub fn summary(&self) -> ArchiveSummary {
        ArchiveSummary {
            morgue_id: self.morgue_id.clone(),
            epoch_id: self.record.epoch_id,
            head_hash: self.record.head_hash,
            previous_head_hash: self.record.previous_head_hash,
            body_checksum: self.record.body_checksum,
            match_count: self.record.match_count,
            total_players: self.record.total_players,
            total_time_played: self.record.total_time_played,
            body_size: self.record.body_size,
            compressed_size: self.record.compressed_body.len() as u64,
            finalized_at: self.record.finalized_at,
            hard_final: self.authentication.is_some(),
        }
    }
}

/// History listing row: archive metadata without the body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveSummary {
    pub morgue_id: MorgueId,
    pub epoch_id: EpochId,
    pub head_hash: Hash,
    pub previous_head_hash: Option<Hash>,
    pub body_checksum: Hash,
    pub match_count: u64,
    pub total_players: u64,
    pub total_time_played: u64,
    pub body_size: u64,
    pub compressed_size: u64,
    pub finalized_at: Timestamp,
    pub hard_final: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_drops_body() {
        let stored = StoredArchive {
            morgue_id: MorgueId::new("morgue-1"),
            record: ArchiveRecord {
                epoch_id: EpochId::parse("2025-01-01").unwrap(),
                head_hash: [1u8; 32],
                previous_head_hash: Some([0u8; 32]),
                body_checksum: [2u8; 32],
                match_count: 3,
                total_players: 6,
                total_time_played: 9_000,
                body_size: 600,
                compressed_body: vec![0u8; 120],
                epoch_created_at: 10,
                finalized_at: 20,
            },
            authentication: None,
        };

        let summary = stored.summary();
        assert_eq!(summary.compressed_size, 120);
        assert_eq!(summary.match_count, 3);
        assert!(!summary.hard_final);
    }
}
