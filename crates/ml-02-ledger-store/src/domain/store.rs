//! Single-owner ledger state with the rollover guard.
//!
//! All mutations go through one mutex. While a rollover is in flight the
//! store is `Closing`: new records are parked in a bounded buffer and land
//! in whichever epoch is live once the rollover commits or aborts.

use super::body::Body;
use super::head::Head;
use crate::error::{LedgerError, LedgerResult};
use parking_lot::Mutex;
use shared_types::{EpochId, Hash, HeadSnapshot, MatchId, MatchRecord, Timestamp};
use std::collections::{HashSet, VecDeque};
use tracing::{debug, warn};

/// Default capacity of the deferred ingestion buffer.
pub const DEFAULT_DEFERRED_CAPACITY: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Live,
    Closing { next: EpochId },
}

struct LedgerState {
    head: Head,
    body: Body,
    phase: Phase,
    seen: HashSet<MatchId>,
    deferred: VecDeque<MatchRecord>,
}

impl LedgerState {
    fn apply(&mut self, record: MatchRecord, now: Timestamp) -> LedgerResult<HeadSnapshot> {
        if self.seen.contains(&record.match_id) {
            return Err(LedgerError::DuplicateMatch {
                match_id: record.match_id,
            });
        }
        let match_id = record.match_id.clone();
        self.body.append(record)?;
        if let Some(appended) = self.body.matches.last() {
            self.head.apply(appended, now);
        }
        self.seen.insert(match_id);
        Ok(self.head.snapshot())
    }

    fn replay_deferred(&mut self, now: Timestamp) -> Vec<HeadSnapshot> {
        let mut applied = Vec::with_capacity(self.deferred.len());
        while let Some(record) = self.deferred.pop_front() {
            let match_id = record.match_id.clone();
            match self.apply(record, now) {
                Ok(snapshot) => applied.push(snapshot),
                Err(e) => warn!(match_id = %match_id, error = %e, "[ml-02] Dropped deferred match"),
            }
        }
        applied
    }
}

/// Result of appending a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppendOutcome {
    /// Applied to the live epoch.
    Applied(HeadSnapshot),
    /// Parked until the in-flight rollover finishes.
    Deferred { queued: usize },
}

/// Outgoing epoch handed to finalization.
#[derive(Debug, Clone)]
pub struct FrozenEpoch {
    pub head: Head,
    pub body: Body,
    pub next_epoch: EpochId,
}

/// Outcome of committing or aborting a rollover.
#[derive(Debug, Clone)]
pub struct RolloverOutcome {
    /// Head after the rollover (new epoch on commit, old one on abort).
    pub head: HeadSnapshot,
    /// One snapshot per replayed deferred record, in replay order.
    pub replayed: Vec<HeadSnapshot>,
}

/// The local peer's only Head/Body pair.
pub struct LedgerStore {
    state: Mutex<LedgerState>,
    deferred_capacity: usize,
}

impl LedgerStore {
    pub fn new(
        epoch_id: EpochId,
        previous_head_hash: Option<Hash>,
        now: Timestamp,
        deferred_capacity: usize,
    ) -> Self {
        Self {
            state: Mutex::new(LedgerState {
                head: Head::genesis(epoch_id, previous_head_hash, now),
                body: Body::new(epoch_id),
                phase: Phase::Live,
                seen: HashSet::new(),
                deferred: VecDeque::new(),
            }),
            deferred_capacity,
        }
    }

    /// Append a validated record, or defer it while a rollover is in flight.
    pub fn append(&self, record: MatchRecord, now: Timestamp) -> LedgerResult<AppendOutcome> {
        validate(&record)?;

        let mut state = self.state.lock();
        match state.phase {
            Phase::Live => state.apply(record, now).map(AppendOutcome::Applied),
            Phase::Closing { next } => {
                let duplicate = state.seen.contains(&record.match_id)
                    || state.deferred.iter().any(|r| r.match_id == record.match_id);
                if duplicate {
                    return Err(LedgerError::DuplicateMatch {
                        match_id: record.match_id,
                    });
                }
                if state.deferred.len() >= self.deferred_capacity {
                    return Err(LedgerError::DeferredBufferFull {
                        capacity: self.deferred_capacity,
                    });
                }
                debug!(match_id = %record.match_id, next = %next, "[ml-02] Deferring match during rollover");
                state.deferred.push_back(record);
                Ok(AppendOutcome::Deferred {
                    queued: state.deferred.len(),
                })
            }
        }
    }

    /// Enter `Closing` and hand out a copy of the outgoing epoch.
    pub fn begin_rollover(&self, next_epoch: EpochId) -> LedgerResult<FrozenEpoch> {
        let mut state = self.state.lock();
        if let Phase::Closing { .. } = state.phase {
            return Err(LedgerError::FinalizationInProgress {
                epoch_id: state.head.epoch_id,
            });
        }
        if next_epoch <= state.head.epoch_id {
            return Err(LedgerError::InvalidRollover {
                current: state.head.epoch_id,
                requested: next_epoch,
            });
        }

        state.phase = Phase::Closing { next: next_epoch };
        state.head.head_hash = state.head.compute_hash();
        Ok(FrozenEpoch {
            head: state.head.clone(),
            body: state.body.clone(),
            next_epoch,
        })
    }

    /// Install the new epoch chained to `finalized_head_hash`, then replay
    /// deferred records into it.
    pub fn commit_rollover(
        &self,
        next_epoch: EpochId,
        finalized_head_hash: Hash,
        now: Timestamp,
    ) -> LedgerResult<RolloverOutcome> {
        let mut state = self.state.lock();
        match state.phase {
            Phase::Closing { next } if next == next_epoch => {}
            _ => {
                return Err(LedgerError::NotClosing {
                    epoch_id: next_epoch,
                })
            }
        }

        state.head = Head::genesis(next_epoch, Some(finalized_head_hash), now);
        state.body = Body::new(next_epoch);
        state.seen.clear();
        state.phase = Phase::Live;
        let replayed = state.replay_deferred(now);
        Ok(RolloverOutcome {
            head: state.head.snapshot(),
            replayed,
        })
    }

    /// Leave the old epoch live and replay deferred records into it.
    pub fn abort_rollover(&self, now: Timestamp) -> LedgerResult<RolloverOutcome> {
        let mut state = self.state.lock();
        let Phase::Closing { .. } = state.phase else {
            return Err(LedgerError::NotClosing {
                epoch_id: state.head.epoch_id,
            });
        };

        state.phase = Phase::Live;
        let replayed = state.replay_deferred(now);
        Ok(RolloverOutcome {
            head: state.head.snapshot(),
            replayed,
        })
    }

    pub fn snapshot(&self) -> HeadSnapshot {
        self.state.lock().head.snapshot()
    }

    pub fn head(&self) -> Head {
        self.state.lock().head.clone()
    }

    pub fn body(&self) -> Body {
        self.state.lock().body.clone()
    }

    pub fn epoch_id(&self) -> EpochId {
        self.state.lock().head.epoch_id
    }

    pub fn is_closing(&self) -> bool {
        matches!(self.state.lock().phase, Phase::Closing { .. })
    }

    pub fn deferred_len(&self) -> usize {
        self.state.lock().deferred.len()
    }

    pub fn contains(&self, match_id: &str) -> bool {
        self.state.lock().seen.contains(match_id)
    }
}

fn validate(record: &MatchRecord) -> LedgerResult<()> {
    let reason = if record.match_id.trim().is_empty() {
        "empty match id"
    } else if record.level_id.trim().is_empty() {
        "empty level id"
    } else if record.participants.is_empty() {
        "no participants"
    } else if record.ended_at < record.started_at {
        "ends before it starts"
    } else {
        return Ok(());
    };
    Err(LedgerError::InvalidRecord {
        match_id: record.match_id.clone(),
        reason: reason.to_string(),
    })
}
