//! Error types for node start-up and wiring.

use crate::adapters::storage::KvError;
use crate::container::ConfigError;
use ml_01_epoch_clock::ClockError;
use ml_02_ledger_store::LedgerError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Clock error: {0}")]
    Clock(#[from] ClockError),

    #[error("Storage error: {0}")]
    Storage(#[from] KvError),

    /// The transport speaks for a different peer than the signing key.
    #[error("Transport peer {transport} does not match identity key {identity}")]
    IdentityMismatch { transport: String, identity: String },
}

pub type NodeResult<T> = Result<T, NodeError>;
