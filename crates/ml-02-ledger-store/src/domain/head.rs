//! The live Head and its chained hash.

use serde::{Deserialize, Serialize};
use shared_crypto::Sha256Hasher;
use shared_types::{EpochId, Hash, HeadSnapshot, MatchRecord, Timestamp};

const GENESIS_DOMAIN: &[u8] = b"ml-genesis-v1";
const HEAD_DOMAIN: &[u8] = b"ml-head-v1";

/// Genesis hash for an epoch with no matches.
///
/// Depends on the epoch id alone, so fresh peers agree without talking.
pub fn genesis_hash(epoch_id: &EpochId) -> Hash {
    let mut hasher = Sha256Hasher::with_domain(GENESIS_DOMAIN);
    hasher.update(epoch_id.to_string().as_bytes());
    hasher.finalize()
}

/// Head hash over the state fields. Timestamps are deliberately excluded.
pub fn compute_head_hash(
    epoch_id: &EpochId,
    previous_head_hash: Option<&Hash>,
    match_count: u64,
    match_hashes: &[Hash],
    total_players: u64,
    total_time_played: u64,
) -> Hash {
    if match_count == 0 {
        return genesis_hash(epoch_id);
    }

    let mut hasher = Sha256Hasher::with_domain(HEAD_DOMAIN);
    hasher.update_framed(epoch_id.to_string().as_bytes());
    match previous_head_hash {
        Some(prev) => {
            hasher.update(&[1u8]).update(prev);
        }
        None => {
            hasher.update(&[0u8]);
        }
    }
    hasher.update_u64(match_count);
    for match_hash in match_hashes {
        hasher.update_framed(match_hash);
    }
    hasher
        .update_u64(total_players)
        .update_u64(total_time_played);
    hasher.finalize()
}

/// Rolling summary of the current epoch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Head {
    pub epoch_id: EpochId,
    pub head_hash: Hash,
    pub previous_head_hash: Option<Hash>,
    pub match_count: u64,
    pub match_hashes: Vec<Hash>,
    pub total_players: u64,
    pub total_time_played: u64,
    pub created_at: Timestamp,
    pub last_updated: Timestamp,
}

impl Head {
    /// Fresh Head for an epoch, chained to the last finalized hash if known.
    pub fn genesis(epoch_id: EpochId, previous_head_hash: Option<Hash>, now: Timestamp) -> Self {
        Self {
            head_hash: genesis_hash(&epoch_id),
            epoch_id,
            previous_head_hash,
            match_count: 0,
            match_hashes: Vec::new(),
            total_players: 0,
            total_time_played: 0,
            created_at: now,
            last_updated: now,
        }
    }

    /// Recompute the hash from the other fields.
    pub fn compute_hash(&self) -> Hash {
        compute_head_hash(
            &self.epoch_id,
            self.previous_head_hash.as_ref(),
            self.match_count,
            &self.match_hashes,
            self.total_players,
            self.total_time_played,
        )
    }

    /// Whether `head_hash` agrees with the rest of the Head.
    pub fn verify(&self) -> bool {
        self.head_hash == self.compute_hash()
    }

    /// Fold a match into the counters and recompute the hash.
    pub fn apply(&mut self, record: &MatchRecord, now: Timestamp) {
        self.match_count += 1;
        self.match_hashes.push(record.match_hash);
        self.total_players = self.total_players.saturating_add(record.player_count());
        self.total_time_played = self.total_time_played.saturating_add(record.duration_ms);
        self.last_updated = now;
        self.head_hash = self.compute_hash();
    }

    pub fn snapshot(&self) -> HeadSnapshot {
        HeadSnapshot {
            epoch_id: self.epoch_id,
            head_hash: self.head_hash,
            previous_head_hash: self.previous_head_hash,
            match_count: self.match_count,
            total_players: self.total_players,
            total_time_played: self.total_time_played,
            created_at: self.created_at,
            last_updated: self.last_updated,
        }
    }
}
