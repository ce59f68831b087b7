//! Error types for the Peer Propagation subsystem

use ml_01_epoch_clock::ClockError;
use shared_types::{PeerId, TransportError};
use thiserror::Error;

/// Propagation errors. None of them affect the local ledger.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PropagationError {
    /// Wire payload failed to encode or decode.
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Transport refused the message.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Sync reply did not arrive within the bounded wait.
    #[error("Sync with {peer} timed out after {waited_ms}ms")]
    SyncTimeout { peer: PeerId, waited_ms: u64 },

    /// Pending sync request was dropped before a reply arrived.
    #[error("Sync request {request_id} cancelled")]
    SyncCancelled { request_id: u64 },

    /// Clock unreadable.
    #[error("Clock error: {0}")]
    Clock(#[from] ClockError),
}

/// Result type for propagation operations
pub type PropagationResult<T> = Result<T, PropagationError>;
