//! Error types for the Beheading subsystem

use ml_01_epoch_clock::ClockError;
use ml_02_ledger_store::LedgerError;
use shared_types::SinkError;
use thiserror::Error;

/// Finalization errors. Any of them leaves the old epoch live.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BeheadingError {
    /// Ledger refused the rollover (already in flight, wrong epoch, ...).
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// Body could not be encoded, compressed or decoded.
    #[error("Morgue codec error: {0}")]
    Codec(String),

    /// Archive write or read failed.
    #[error("Morgue error: {0}")]
    Sink(#[from] SinkError),

    /// Clock unreadable.
    #[error("Clock error: {0}")]
    Clock(#[from] ClockError),
}

/// Result type for finalization operations
pub type FinalizationResult<T> = Result<T, BeheadingError>;
