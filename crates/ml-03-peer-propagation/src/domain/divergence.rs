//! Head comparison and the divergence log.
//!
//! Comparison only classifies; nothing here changes the local Head. A peer
//! being ahead is a reconciliation need, never a reason to adopt its state.

use serde::{Deserialize, Serialize};
use shared_types::{EpochId, Hash, HeadSnapshot, PeerId, Timestamp};
use std::collections::HashMap;

/// How a peer's Head relates to ours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HeadComparison {
    /// Same epoch, same hash.
    InSync,
    /// Different epoch; the update is discarded.
    EpochMismatch { local: EpochId, peer: EpochId },
    /// Peer has seen more matches.
    PeerAhead { local_count: u64, peer_count: u64 },
    /// Peer has seen fewer matches.
    PeerBehind { local_count: u64, peer_count: u64 },
    /// Same count, different hash.
    Conflicting { match_count: u64 },
}

impl HeadComparison {
    /// Whether the comparison goes into the divergence log.
    pub fn is_divergence(&self) -> bool {
        matches!(
            self,
            HeadComparison::PeerAhead { .. } | HeadComparison::Conflicting { .. }
        )
    }
}

/// Classify `peer` against `local`.
pub fn compare_heads(local: &HeadSnapshot, peer: &HeadSnapshot) -> HeadComparison {
    if local.epoch_id != peer.epoch_id {
        return HeadComparison::EpochMismatch {
            local: local.epoch_id,
            peer: peer.epoch_id,
        };
    }
    if peer.match_count > local.match_count {
        HeadComparison::PeerAhead {
            local_count: local.match_count,
            peer_count: peer.match_count,
        }
    } else if peer.match_count < local.match_count {
        HeadComparison::PeerBehind {
            local_count: local.match_count,
            peer_count: peer.match_count,
        }
    } else if peer.head_hash != local.head_hash {
        HeadComparison::Conflicting {
            match_count: local.match_count,
        }
    } else {
        HeadComparison::InSync
    }
}

/// Latest divergent Head seen from one peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DivergenceRecord {
    pub peer: PeerId,
    pub epoch_id: EpochId,
    pub local_count: u64,
    pub peer_count: u64,
    pub peer_head_hash: Hash,
    pub comparison: HeadComparison,
    pub observed_at: Timestamp,
}

/// Bounded per-peer divergence history.
#[derive(Debug)]
pub struct DivergenceLog {
    entries: HashMap<PeerId, DivergenceRecord>,
    capacity: usize,
}

impl DivergenceLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// Record a divergence, replacing the peer's previous entry. When full,
    /// the stalest peer is evicted.
    pub fn record(&mut self, record: DivergenceRecord) {
        if !self.entries.contains_key(&record.peer) && self.entries.len() >= self.capacity {
            let stalest = self
                .entries
                .values()
                .min_by_key(|r| r.observed_at)
                .map(|r| r.peer);
            if let Some(peer) = stalest {
                self.entries.remove(&peer);
            }
        }
        self.entries.insert(record.peer, record);
    }

    /// Forget peers whose last divergence was for an older epoch.
    pub fn prune_before(&mut self, epoch_id: EpochId) {
        self.entries.retain(|_, r| r.epoch_id >= epoch_id);
    }

    /// Newest first.
    pub fn entries(&self) -> Vec<DivergenceRecord> {
        let mut all: Vec<_> = self.entries.values().cloned().collect();
        all.sort_by(|a, b| b.observed_at.cmp(&a.observed_at));
        all
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
