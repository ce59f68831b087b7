//! Claims, vouches and disputes that arrive before the local peer has
//! finalized the epoch they refer to. Bounded; oldest entries go first.

use crate::domain::messages::{BeheadingClaim, DisputeNotice, Vouch};
use shared_types::{EpochId, PeerId};
use std::collections::VecDeque;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EarlyMessage {
    Claim { from: PeerId, claim: BeheadingClaim },
    Vouch(Vouch),
    Dispute(DisputeNotice),
}

impl EarlyMessage {
    pub fn epoch_id(&self) -> EpochId {
        match self {
            EarlyMessage::Claim { claim, .. } => claim.result.epoch_id,
            EarlyMessage::Vouch(vouch) => vouch.epoch_id,
            EarlyMessage::Dispute(notice) => notice.epoch_id,
        }
    }
}

#[derive(Debug)]
pub struct EarlyBuffer {
    entries: VecDeque<EarlyMessage>,
    capacity: usize,
}

impl EarlyBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity,
        }
    }

    /// Queue a message. Returns the evicted entry when full.
    pub fn push(&mut self, message: EarlyMessage) -> Option<EarlyMessage> {
        if self.capacity == 0 {
            return Some(message);
        }
        let evicted = if self.entries.len() >= self.capacity {
            self.entries.pop_front()
        } else {
            None
        };
        self.entries.push_back(message);
        evicted
    }

    /// Remove and return every message for `epoch_id`, in arrival order.
    pub fn take_for(&mut self, epoch_id: &EpochId) -> Vec<EarlyMessage> {
        let (matching, rest): (Vec<_>, Vec<_>) = self
            .entries
            .drain(..)
            .partition(|m| m.epoch_id() == *epoch_id);
        self.entries = rest.into();
        matching
    }

    /// Drop messages for epochs before `epoch_id`. Returns how many went.
    pub fn discard_before(&mut self, epoch_id: &EpochId) -> usize {
        let before = self.entries.len();
        self.entries.retain(|m| m.epoch_id() >= *epoch_id);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
