//! Driving Ports (API - Inbound)

use crate::domain::{DivergenceRecord, HeadComparison, HeadUpdate, SyncRequest};
use crate::error::PropagationResult;
use async_trait::async_trait;
use shared_types::{HeadSnapshot, PeerId};

/// Head propagation API.
#[async_trait]
pub trait PropagationApi: Send + Sync {
    /// Best-effort broadcast of a Head. Returns the number of peers reached.
    async fn broadcast_head(&self, head: HeadSnapshot) -> PropagationResult<usize>;

    /// Ask one peer for its Head and classify it, waiting at most the
    /// configured sync timeout.
    async fn request_sync(&self, peer: PeerId) -> PropagationResult<HeadComparison>;

    /// Process a Head received from a peer.
    async fn handle_head_update(&self, from: PeerId, update: HeadUpdate) -> HeadComparison;

    /// Answer a peer's sync request with our Head.
    async fn handle_sync_request(&self, from: PeerId, request: SyncRequest)
        -> PropagationResult<()>;

    /// Divergences observed so far, newest first.
    fn divergences(&self) -> Vec<DivergenceRecord>;
}
