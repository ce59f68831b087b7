//! # Query Surface
//!
//! Read-only views over a running node: live stats, morgue history,
//! archived bodies, quorum state, divergence log and event subscriptions.

use crate::container::LedgerSink;
use crate::node::LedgerNode;
use ml_01_epoch_clock::ClockResult;
use ml_03_peer_propagation::{DivergenceRecord, PropagationApi};
use ml_04_beheading::FinalizationResult;
use ml_05_peer_council::{CouncilApi, QuorumSnapshot};
use serde::{Deserialize, Serialize};
use shared_bus::{EventFilter, Subscription};
use shared_types::{ArchiveSummary, EpochId, Hash, MatchRecord, PeerId};

/// Live epoch statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochStats {
    pub epoch_id: EpochId,
    pub head_hash: Hash,
    pub previous_head_hash: Option<Hash>,
    pub match_count: u64,
    pub total_players: u64,
    pub total_time_played: u64,
    /// Zero once the clock has moved past the live epoch.
    pub ms_until_finalization: u64,
    pub is_finalization_window: bool,
    pub finalization_in_progress: bool,
}

impl<S: LedgerSink> LedgerNode<S> {
    pub fn peer_id(&self) -> PeerId {
        self.container().transport.local_peer()
    }

    pub fn current_stats(&self) -> ClockResult<EpochStats> {
        let container = self.container();
        let head = container.store().snapshot();
        let info = container.clock.now()?;

        let (ms_until_finalization, is_finalization_window) = if head.epoch_id == info.epoch_id {
            (info.ms_remaining, info.is_finalization_window)
        } else {
            (0, true)
        };

        Ok(EpochStats {
            epoch_id: head.epoch_id,
            head_hash: head.head_hash,
            previous_head_hash: head.previous_head_hash,
            match_count: head.match_count,
            total_players: head.total_players,
            total_time_played: head.total_time_played,
            ms_until_finalization,
            is_finalization_window,
            finalization_in_progress: container.store().is_closing(),
        })
    }

    /// Newest-first archive summaries, `limit` capped by the page size.
    pub async fn morgue_history(&self, limit: usize) -> FinalizationResult<Vec<ArchiveSummary>> {
        self.container().morgue.history(limit).await
    }

    /// Decompressed match list of an archived epoch.
    pub async fn archived_matches(
        &self,
        epoch_id: &EpochId,
    ) -> FinalizationResult<Option<Vec<MatchRecord>>> {
        self.container().morgue.archived_matches(epoch_id).await
    }

    pub fn quorum_status(&self, epoch_id: &EpochId) -> Option<QuorumSnapshot> {
        self.container().council.quorum_status(epoch_id)
    }

    pub fn divergences(&self) -> Vec<DivergenceRecord> {
        self.container().propagation.divergences()
    }

    pub fn subscribe(&self, filter: EventFilter) -> Subscription {
        self.container().bus.subscribe(filter)
    }
}
