//! Per-epoch quorum state
//!
//! State progression:
//!
//! ```text
//! Pending → Verifying → Vouching → HardFinal
//!               │           │
//!               └───────────┴────→ Disputed
//! ```
//!
//! `HardFinal` and `Disputed` are terminal. Signatures arriving after
//! either are still recorded but never change the state. Disputes raised by
//! other members are kept for audit and do not block `HardFinal`.

use crate::domain::messages::Vouch;
use serde::{Deserialize, Serialize};
use shared_types::{BeheadingResult, EpochId, Hash, PeerId};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum QuorumStatus {
    /// Local result known, verification not started.
    #[default]
    Pending,
    /// Recomputing the checksum from the archive.
    Verifying,
    /// Verified; collecting signatures.
    Vouching,
    /// Threshold reached.
    HardFinal,
    /// Local verification disagreed with the claim.
    Disputed,
}

impl QuorumStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, QuorumStatus::HardFinal | QuorumStatus::Disputed)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum VouchRejection {
    NotCouncilMember,
    ChecksumMismatch { expected: Hash, got: Hash },
    InvalidSignature,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum VouchOutcome {
    /// Counted; threshold not reached yet.
    Accepted { signers: usize },
    /// This vouch completed the quorum.
    HardFinalReached,
    /// Recorded after the quorum was already terminal.
    Late,
    /// Member already signed.
    Duplicate,
    /// Epoch not finalized locally yet; held for later.
    Deferred,
    /// Epoch older than the newest local finalization and no longer tracked.
    Stale,
    Rejected(VouchRejection),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisputeRecord {
    pub member: PeerId,
    pub claimed_checksum: Hash,
    pub observed_checksum: Hash,
}

/// Read-only view for the query surface.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuorumSnapshot {
    pub epoch_id: EpochId,
    pub status: QuorumStatus,
    pub body_checksum: Hash,
    pub council: Vec<PeerId>,
    pub threshold: usize,
    pub signers: Vec<PeerId>,
    pub disputes: Vec<DisputeRecord>,
}

/// Signature accumulation for one finalized epoch.
#[derive(Clone, Debug)]
pub struct EpochQuorum {
    result: BeheadingResult,
    council: Vec<PeerId>,
    threshold: usize,
    status: QuorumStatus,
    disputes: BTreeMap<PeerId, DisputeRecord>,
    disputed_claims: BTreeSet<Hash>,
    local_vouch: Option<Vouch>,
    archive_marked: bool,
}

impl EpochQuorum {
    pub fn new(result: BeheadingResult, council: Vec<PeerId>, threshold: usize) -> Self {
        Self {
            result,
            council,
            threshold,
            status: QuorumStatus::Pending,
            disputes: BTreeMap::new(),
            disputed_claims: BTreeSet::new(),
            local_vouch: None,
            archive_marked: false,
        }
    }

    pub fn epoch_id(&self) -> EpochId {
        self.result.epoch_id
    }

    pub fn status(&self) -> QuorumStatus {
        self.status
    }

    pub fn result(&self) -> &BeheadingResult {
        &self.result
    }

    pub fn body_checksum(&self) -> Hash {
        self.result.body_checksum
    }

    pub fn council(&self) -> &[PeerId] {
        &self.council
    }

    pub fn is_member(&self, peer: &PeerId) -> bool {
        self.council.contains(peer)
    }

    pub fn needs_verification(&self) -> bool {
        matches!(self.status, QuorumStatus::Pending | QuorumStatus::Verifying)
    }

    pub fn begin_verification(&mut self) -> bool {
        if self.status == QuorumStatus::Pending {
            self.status = QuorumStatus::Verifying;
            true
        } else {
            false
        }
    }

    /// Archive matched the claim. Returns true if the state changed.
    pub fn verification_passed(&mut self) -> bool {
        if self.needs_verification() {
            self.status = QuorumStatus::Vouching;
            true
        } else {
            false
        }
    }

    /// Archive disagreed with the claim. Returns true if the state changed.
    pub fn verification_failed(&mut self) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = QuorumStatus::Disputed;
        true
    }

    pub fn add_vouch(&mut self, member: PeerId, checksum: Hash, signature: Vec<u8>) -> VouchOutcome {
        if !self.is_member(&member) {
            return VouchOutcome::Rejected(VouchRejection::NotCouncilMember);
        }
        if checksum != self.result.body_checksum {
            return VouchOutcome::Rejected(VouchRejection::ChecksumMismatch {
                expected: self.result.body_checksum,
                got: checksum,
            });
        }
        if !self.result.record_signature(member, signature) {
            return VouchOutcome::Duplicate;
        }
        if self.status.is_terminal() {
            return VouchOutcome::Late;
        }
        if self.result.is_hard_final(self.threshold) {
            self.status = QuorumStatus::HardFinal;
            return VouchOutcome::HardFinalReached;
        }
        VouchOutcome::Accepted {
            signers: self.result.authenticated_by.len(),
        }
    }

    /// Returns false for non-members and repeated disputes.
    pub fn record_dispute(&mut self, record: DisputeRecord) -> bool {
        if !self.is_member(&record.member) || self.disputes.contains_key(&record.member) {
            return false;
        }
        self.disputes.insert(record.member, record);
        true
    }

    /// First sighting of a foreign claim checksum we disagree with.
    pub fn note_disputed_claim(&mut self, claimed: Hash) -> bool {
        self.disputed_claims.insert(claimed)
    }

    pub fn local_vouch(&self) -> Option<&Vouch> {
        self.local_vouch.as_ref()
    }

    pub fn set_local_vouch(&mut self, vouch: Vouch) {
        self.local_vouch = Some(vouch);
    }

    pub fn needs_archive_mark(&self) -> bool {
        self.status == QuorumStatus::HardFinal && !self.archive_marked
    }

    pub fn mark_archived(&mut self) {
        self.archive_marked = true;
    }

    pub fn snapshot(&self) -> QuorumSnapshot {
        QuorumSnapshot {
            epoch_id: self.result.epoch_id,
            status: self.status,
            body_checksum: self.result.body_checksum,
            council: self.council.clone(),
            threshold: self.threshold,
            signers: self.result.authenticated_by.clone(),
            disputes: self.disputes.values().cloned().collect(),
        }
    }
}
