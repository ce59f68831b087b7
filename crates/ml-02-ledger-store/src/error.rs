//! Error types for the Ledger Store subsystem

use ml_01_epoch_clock::ClockError;
use shared_types::{EntityError, EpochId, MatchId, SinkError};
use thiserror::Error;

/// Ledger store and ingestion errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LedgerError {
    /// Record failed precondition checks; nothing was changed.
    #[error("Invalid match record {match_id}: {reason}")]
    InvalidRecord { match_id: MatchId, reason: String },

    /// Match id already present in the current epoch (or deferred buffer).
    #[error("Duplicate match: {match_id}")]
    DuplicateMatch { match_id: MatchId },

    /// Too many matches arrived while a rollover was in flight.
    #[error("Deferred ingestion buffer full ({capacity} records)")]
    DeferredBufferFull { capacity: usize },

    /// A rollover is already in flight.
    #[error("Finalization of {epoch_id} already in progress")]
    FinalizationInProgress { epoch_id: EpochId },

    /// Rollover must move forward in time.
    #[error("Invalid rollover from {current} to {requested}")]
    InvalidRollover { current: EpochId, requested: EpochId },

    /// Commit/abort called without a rollover in flight, or for another epoch.
    #[error("No rollover in progress for {epoch_id}")]
    NotClosing { epoch_id: EpochId },

    /// Canonical encoding failed.
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Clock unreadable.
    #[error("Clock error: {0}")]
    Clock(#[from] ClockError),

    /// Durable sink failure.
    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),
}

impl From<EntityError> for LedgerError {
    fn from(err: EntityError) -> Self {
        LedgerError::Encoding(err.to_string())
    }
}

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;
