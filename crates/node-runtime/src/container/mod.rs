//! # Ledger Container
//!
//! Configuration and the wired set of subsystem services for one peer.

pub mod config;
pub mod subsystems;

pub use config::{
    ConfigError, EpochConfig, IdentityConfig, LedgerConfig, MorgueConfig, NetworkConfig,
    NodeConfig, StorageConfig,
};
pub use subsystems::{LedgerContainer, LedgerSink, TickReport};
