//! Driving Ports (API - Inbound)

use crate::domain::{BeheadingClaim, DisputeNotice, QuorumSnapshot, Vouch, VouchOutcome};
use crate::error::CouncilResult;
use async_trait::async_trait;
use shared_types::{BeheadingResult, EpochId, PeerId};

/// Quorum authentication API.
#[async_trait]
pub trait CouncilApi: Send + Sync {
    /// Start authenticating a locally finalized epoch: announce the claim,
    /// verify it against the archive and vouch if it holds.
    async fn on_local_finalization(&self, result: BeheadingResult) -> CouncilResult<QuorumSnapshot>;

    async fn handle_claim(&self, from: PeerId, claim: BeheadingClaim);

    async fn handle_vouch(&self, from: PeerId, vouch: Vouch) -> VouchOutcome;

    async fn handle_dispute(&self, from: PeerId, notice: DisputeNotice);

    /// Retry verifications and archive marking that failed earlier.
    /// Returns the number of epochs retried.
    async fn retry_pending(&self) -> usize;

    fn quorum_status(&self, epoch_id: &EpochId) -> Option<QuorumSnapshot>;
}
