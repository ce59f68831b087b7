//! # Ledger Snapshots
//!
//! Values that leave the ledger store: the soft `HeadSnapshot` broadcast to
//! peers, and the `BeheadingResult` produced once per epoch rollover.

use crate::entities::{EpochId, Hash, MorgueId, PeerId, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Point-in-time copy of a peer's live Head, without the match hash list.
///
/// Soft state: used for live stats and divergence detection only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadSnapshot {
    pub epoch_id: EpochId,
    pub head_hash: Hash,
    pub previous_head_hash: Option<Hash>,
    pub match_count: u64,
    pub total_players: u64,
    pub total_time_played: u64,
    pub created_at: Timestamp,
    pub last_updated: Timestamp,
}

/// Outcome of finalizing one epoch.
///
/// Provisional until `authenticated_by` reaches the quorum threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeheadingResult {
    pub epoch_id: EpochId,
    /// Final chained head hash of the epoch.
    pub head_hash: Hash,
    /// Chain link this epoch was started with. Seeds the council for it.
    pub previous_head_hash: Option<Hash>,
    /// Independent digest over the ordered match list.
    pub body_checksum: Hash,
    pub match_count: u64,
    /// Archive location in the morgue.
    pub morgue_id: MorgueId,
    /// Council members who vouched, in arrival order.
    pub authenticated_by: Vec<PeerId>,
    /// Member -> signature over the checksum.
    pub signatures: BTreeMap<PeerId, Vec<u8>>,
    pub finalized_at: Timestamp,
}

impl BeheadingResult {
    /// Whether the signature threshold has been reached.
    pub fn is_hard_final(&self, threshold: usize) -> bool {
        threshold > 0 && self.authenticated_by.len() >= threshold
    }

    /// Record a member's signature. Returns false if the member already signed.
    pub fn record_signature(&mut self, member: PeerId, signature: Vec<u8>) -> bool {
        if self.signatures.contains_key(&member) {
            return false;
        }
        self.signatures.insert(member, signature);
        self.authenticated_by.push(member);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result() -> BeheadingResult {
        BeheadingResult {
            epoch_id: EpochId::parse("2025-01-01").unwrap(),
            head_hash: [1u8; 32],
            previous_head_hash: None,
            body_checksum: [2u8; 32],
            match_count: 4,
            morgue_id: MorgueId::new("m-1"),
            authenticated_by: Vec::new(),
            signatures: BTreeMap::new(),
            finalized_at: 0,
        }
    }

    #[test]
    fn test_hard_final_at_threshold() {
        let mut r = result();
        assert!(!r.is_hard_final(2));
        assert!(r.record_signature(PeerId([1u8; 32]), vec![1]));
        assert!(!r.is_hard_final(2));
        assert!(r.record_signature(PeerId([2u8; 32]), vec![2]));
        assert!(r.is_hard_final(2));
    }

    #[test]
    fn test_duplicate_signature_ignored() {
        let mut r = result();
        assert!(r.record_signature(PeerId([1u8; 32]), vec![1]));
        assert!(!r.record_signature(PeerId([1u8; 32]), vec![9]));
        assert_eq!(r.authenticated_by.len(), 1);
        assert_eq!(r.signatures[&PeerId([1u8; 32])], vec![1]);
    }

    #[test]
    fn test_zero_threshold_never_final() {
        assert!(!result().is_hard_final(0));
    }
}
