//! Error types for the Peer Council subsystem

use ml_02_ledger_store::LedgerError;
use ml_04_beheading::BeheadingError;
use shared_types::{EpochId, PeerId, SinkError, TransportError};
use thiserror::Error;

/// Council errors. None of them touch the live ledger.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CouncilError {
    /// Wire payload failed to encode or decode.
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Transport refused the message.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Archive lookup or marking failed.
    #[error("Archive error: {0}")]
    Archive(#[from] SinkError),

    /// Archived body could not be restored.
    #[error("Archive body error: {0}")]
    Body(#[from] BeheadingError),

    /// Checksum could not be recomputed.
    #[error("Checksum error: {0}")]
    Checksum(#[from] LedgerError),

    /// No local quorum is tracked for this epoch.
    #[error("No quorum for epoch {epoch_id}")]
    UnknownEpoch { epoch_id: EpochId },

    /// Signature did not verify against the member's key.
    #[error("Invalid signature from {member}")]
    InvalidSignature { member: PeerId },
}

/// Result type for council operations
pub type CouncilResult<T> = Result<T, CouncilError>;
