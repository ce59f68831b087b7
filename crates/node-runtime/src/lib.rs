//! # Node Runtime Library
//!
//! Wires the ledger subsystems into a running peer. The binary entry point
//! is `main.rs`; integration tests drive `LedgerNode` directly.
//!
//! ```text
//!              ┌──────────────── LedgerNode ────────────────┐
//!  record_match│  IngestionService ──→ LedgerStore ──→ bus  │──→ head broadcaster
//!              │                          │                 │
//!  clock loop ─┼─→ tick: BeheadingService ┴─→ CouncilService│──→ council.* topics
//!              │         │                        │         │
//!              └─────────┼────────────────────────┼─────────┘
//!                        ▼                        ▼
//!                  KvLedgerSink (InMemoryKVStore | RocksDbStore)
//! ```

#![allow(clippy::type_complexity)]

pub mod adapters;
pub mod container;
pub mod error;
pub mod node;
pub mod query;

pub use adapters::{
    InMemoryKVStore, InMemoryLedgerSink, KvLedgerSink, LoopbackNetwork, LoopbackTransport,
};
pub use container::{ConfigError, LedgerContainer, LedgerSink, NodeConfig, TickReport};
pub use error::{NodeError, NodeResult};
pub use node::LedgerNode;
pub use query::EpochStats;
