//! Error types for the Epoch Clock subsystem

use thiserror::Error;

/// Epoch clock errors. Both are fatal to the caller: a peer with no usable
/// clock cannot decide which epoch a match belongs to.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClockError {
    /// System clock could not be read (e.g. set before 1970).
    #[error("System clock unavailable: {reason}")]
    Unavailable { reason: String },

    /// Timestamp cannot be mapped to a calendar date.
    #[error("Timestamp out of range: {timestamp_ms}")]
    OutOfRange { timestamp_ms: u64 },
}

/// Result type for clock operations
pub type ClockResult<T> = Result<T, ClockError>;
