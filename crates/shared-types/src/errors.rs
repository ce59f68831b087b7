//! # Error Types
//!
//! Defines error types for the external collaborators shared by subsystems:
//! the durable sink and the peer transport.

use thiserror::Error;

/// Errors raised by the durable sink (live match upserts and the morgue).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SinkError {
    /// Sink could not be reached or refused the write. Retryable.
    #[error("Sink unavailable: {0}")]
    Unavailable(String),

    /// Stored data failed to decode.
    #[error("Data corruption: {0}")]
    Corrupt(String),

    /// Requested key does not exist.
    #[error("Not found: {0}")]
    NotFound(String),
}

impl SinkError {
    /// Whether a retry might succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, SinkError::Unavailable(_))
    }
}

/// Errors raised by the peer transport.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// Named peer is offline or unknown to the transport.
    #[error("Peer unreachable: {0}")]
    PeerUnreachable(String),

    /// Transport has been shut down.
    #[error("Transport closed")]
    Closed,

    /// Payload could not be encoded or decoded.
    #[error("Encoding error: {0}")]
    Encoding(String),
}
