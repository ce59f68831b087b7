//! Wire messages for head propagation.

use crate::error::{PropagationError, PropagationResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use shared_types::{EpochId, HeadSnapshot};

/// Broadcast of a Head, or the reply to a sync request.
pub const HEAD_UPDATE_TOPIC: &str = "ledger.head-update";

/// Point-to-point request for a peer's current Head.
pub const SYNC_REQUEST_TOPIC: &str = "ledger.sync-request";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadUpdate {
    pub head: HeadSnapshot,
    /// Set when answering a `SyncRequest`.
    pub in_reply_to: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncRequest {
    pub request_id: u64,
    /// Requester's current epoch.
    pub epoch_id: EpochId,
}

/// bincode-encode a wire message.
pub fn encode<T: Serialize>(message: &T) -> PropagationResult<Vec<u8>> {
    bincode::serialize(message).map_err(|e| PropagationError::Encoding(e.to_string()))
}

/// bincode-decode a wire message.
pub fn decode<T: DeserializeOwned>(payload: &[u8]) -> PropagationResult<T> {
    bincode::deserialize(payload).map_err(|e| PropagationError::Encoding(e.to_string()))
}
