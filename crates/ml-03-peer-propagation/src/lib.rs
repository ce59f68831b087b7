//! # ml-03-peer-propagation
//!
//! Peer Propagation: broadcasts Head snapshots and answers sync requests.
//!
//! ```text
//! LedgerStore ──HeadUpdated──→ bus ──→ broadcaster ──ledger.head-update──→ peers
//!
//! peer ──ledger.sync-request──→ handler ──ledger.head-update (in_reply_to)──→ peer
//!
//! peer head ──→ compare_heads ──┬── other epoch: discard
//!                               ├── behind / in sync: ignore
//!                               └── ahead / conflicting: log + DivergenceObserved
//! ```
//!
//! Peer Heads are soft state. They keep live stats roughly aligned and are
//! never used to arbitrate the ledger.

pub mod adapters;
pub mod domain;
pub mod error;
pub mod ports;
pub mod service;

pub use domain::{
    compare_heads, DivergenceLog, DivergenceRecord, HeadComparison, HeadUpdate, SyncRequest,
    HEAD_UPDATE_TOPIC, SYNC_REQUEST_TOPIC,
};
pub use error::{PropagationError, PropagationResult};
pub use ports::{LocalHeadProvider, PropagationApi};
pub use service::{PropagationConfig, PropagationService};
