//! Council wire messages and the byte strings members sign.

use crate::error::{CouncilError, CouncilResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use shared_types::{BeheadingResult, EpochId, Hash, PeerId};

/// A peer announcing its finalized epoch.
pub const CLAIM_TOPIC: &str = "council.claim";

/// A council member's signature over a checksum.
pub const VOUCH_TOPIC: &str = "council.vouch";

/// A council member refusing to sign a claimed checksum.
pub const DISPUTE_TOPIC: &str = "council.dispute";

const SIGNING_DOMAIN: &[u8] = b"ml-council-v1";
const VOUCH_TAG: &[u8] = b"vouch";
const DISPUTE_TAG: &[u8] = b"dispute";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeheadingClaim {
    pub result: BeheadingResult,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vouch {
    pub epoch_id: EpochId,
    pub body_checksum: Hash,
    pub member: PeerId,
    /// Over `vouch_message(epoch_id, body_checksum)`.
    pub signature: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisputeNotice {
    pub epoch_id: EpochId,
    pub claimed_checksum: Hash,
    pub observed_checksum: Hash,
    pub member: PeerId,
    /// Over `dispute_message(epoch_id, claimed, observed)`.
    pub signature: Vec<u8>,
}

fn signing_prefix(tag: &[u8], epoch_id: &EpochId) -> Vec<u8> {
    let epoch = epoch_id.to_string();
    let mut message = Vec::with_capacity(SIGNING_DOMAIN.len() + tag.len() + epoch.len() + 64);
    message.extend_from_slice(SIGNING_DOMAIN);
    message.extend_from_slice(tag);
    message.extend_from_slice(epoch.as_bytes());
    message
}

/// Bytes signed by a vouching member.
pub fn vouch_message(epoch_id: &EpochId, checksum: &Hash) -> Vec<u8> {
    let mut message = signing_prefix(VOUCH_TAG, epoch_id);
    message.extend_from_slice(checksum);
    message
}

/// Bytes signed by a disputing member.
pub fn dispute_message(epoch_id: &EpochId, claimed: &Hash, observed: &Hash) -> Vec<u8> {
    let mut message = signing_prefix(DISPUTE_TAG, epoch_id);
    message.extend_from_slice(claimed);
    message.extend_from_slice(observed);
    message
}

impl Vouch {
    pub fn signing_message(&self) -> Vec<u8> {
        vouch_message(&self.epoch_id, &self.body_checksum)
    }
}

impl DisputeNotice {
    pub fn signing_message(&self) -> Vec<u8> {
        dispute_message(&self.epoch_id, &self.claimed_checksum, &self.observed_checksum)
    }
}

/// bincode-encode a wire message.
pub fn encode<T: Serialize>(message: &T) -> CouncilResult<Vec<u8>> {
    bincode::serialize(message).map_err(|e| CouncilError::Encoding(e.to_string()))
}

/// bincode-decode a wire message.
pub fn decode<T: DeserializeOwned>(payload: &[u8]) -> CouncilResult<T> {
    bincode::deserialize(payload).map_err(|e| CouncilError::Encoding(e.to_string()))
}
