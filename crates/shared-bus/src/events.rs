//! # Ledger Events
//!
//! Defines all event types that flow through the shared bus. Consumers are
//! UIs, the propagation subsystem and integration tests.

use serde::{Deserialize, Serialize};
use shared_types::{BeheadingResult, EpochId, Hash, HeadSnapshot, PeerId};

/// All events that can be published to the event bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum LedgerEvent {
    // =========================================================================
    // SUBSYSTEM 2: LEDGER STORE
    // =========================================================================
    /// The live Head changed after a match was ingested.
    HeadUpdated(HeadSnapshot),

    // =========================================================================
    // SUBSYSTEM 3: PEER PROPAGATION
    // =========================================================================
    /// A peer reported a Head for our epoch that disagrees with ours.
    /// Logged only; the local Head is never touched.
    DivergenceObserved {
        /// Reporting peer.
        peer: PeerId,
        /// Shared epoch.
        epoch_id: EpochId,
        /// Local match count at the time.
        local_count: u64,
        /// Peer's match count.
        peer_count: u64,
    },

    // =========================================================================
    // SUBSYSTEM 4: BEHEADING
    // =========================================================================
    /// Rollover of `epoch_id` began; ingestion is being deferred.
    FinalizationStarted {
        /// Outgoing epoch.
        epoch_id: EpochId,
    },

    /// Rollover succeeded. The result is provisional until authenticated.
    FinalizationComplete(BeheadingResult),

    /// Rollover failed; the old epoch stays live and will be retried.
    FinalizationFailed {
        /// Epoch that could not be finalized.
        epoch_id: EpochId,
        /// Failure description.
        reason: String,
    },

    // =========================================================================
    // SUBSYSTEM 5: PEER COUNCIL
    // =========================================================================
    /// The epoch reached the signature threshold and is hard-final.
    QuorumAuthenticated {
        /// Authenticated epoch.
        epoch_id: EpochId,
        /// Checksum the council signed.
        body_checksum: Hash,
        /// Signers at the moment of the transition.
        authenticated_by: Vec<PeerId>,
    },

    /// A council member's checksum disagreed with the claimed one.
    QuorumDisputed {
        /// Disputed epoch.
        epoch_id: EpochId,
        /// Member that raised the dispute.
        disputed_by: PeerId,
        /// Checksum in the claim.
        claimed_checksum: Hash,
        /// Checksum the member computed.
        observed_checksum: Hash,
    },
}

impl LedgerEvent {
    /// Get the topic for this event (for filtering).
    #[must_use]
    pub fn topic(&self) -> EventTopic {
        match self {
            Self::HeadUpdated(_) => EventTopic::Ledger,
            Self::DivergenceObserved { .. } => EventTopic::Propagation,
            Self::FinalizationStarted { .. }
            | Self::FinalizationComplete(_)
            | Self::FinalizationFailed { .. } => EventTopic::Beheading,
            Self::QuorumAuthenticated { .. } | Self::QuorumDisputed { .. } => EventTopic::Council,
        }
    }

    /// Epoch the event refers to.
    #[must_use]
    pub fn epoch_id(&self) -> EpochId {
        match self {
            Self::HeadUpdated(head) => head.epoch_id,
            Self::FinalizationComplete(result) => result.epoch_id,
            Self::DivergenceObserved { epoch_id, .. }
            | Self::FinalizationStarted { epoch_id }
            | Self::FinalizationFailed { epoch_id, .. }
            | Self::QuorumAuthenticated { epoch_id, .. }
            | Self::QuorumDisputed { epoch_id, .. } => *epoch_id,
        }
    }
}

/// Event topics for subscription filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventTopic {
    /// Subsystem 2 events.
    Ledger,
    /// Subsystem 3 events.
    Propagation,
    /// Subsystem 4 events.
    Beheading,
    /// Subsystem 5 events.
    Council,
    /// All events (no filtering).
    All,
}

/// Filter for subscribing to specific events.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Topics to include. Empty means all topics.
    pub topics: Vec<EventTopic>,
    /// Epochs to include. Empty means all epochs.
    pub epochs: Vec<EpochId>,
}

impl EventFilter {
    /// Create a filter that accepts all events.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Create a filter for specific topics.
    #[must_use]
    pub fn topics(topics: Vec<EventTopic>) -> Self {
        Self {
            topics,
            epochs: Vec::new(),
        }
    }

    /// Restrict the filter to one epoch.
    #[must_use]
    pub fn for_epoch(mut self, epoch_id: EpochId) -> Self {
        self.epochs.push(epoch_id);
        self
    }

    /// Check if an event matches this filter.
    #[must_use]
    pub fn matches(&self, event: &LedgerEvent) -> bool {
        let topic_match = self.topics.is_empty()
            || self.topics.contains(&EventTopic::All)
            || self.topics.contains(&event.topic());

        let epoch_match = self.epochs.is_empty() || self.epochs.contains(&event.epoch_id());

        topic_match && epoch_match
    }
}
