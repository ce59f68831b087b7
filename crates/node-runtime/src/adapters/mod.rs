//! # Adapter Implementations
//!
//! Concrete implementations of the subsystems' outbound ports.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                 OUTER LAYER (Adapters)                     │
//! │   KvLedgerSink ── MatchSink, MorgueWriter, MorgueReader,   │
//! │                   CouncilArchive                           │
//! │   LoopbackTransport ── PeerTransport                       │
//! └────────────────────────────────────────────────────────────┘
//!                         ↑ implements ↑
//!                 subsystem outbound ports
//! ```

pub mod sink;
pub mod storage;
pub mod transport;

pub use sink::{InMemoryLedgerSink, KvLedgerSink};
pub use storage::{BatchOperation, InMemoryKVStore, KeyValueStore, KvError};
pub use transport::{LoopbackNetwork, LoopbackTransport};
