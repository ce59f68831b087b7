//! # ml-05-peer-council
//!
//! Peer Council: a rotating subset of peers that independently verifies a
//! finalized epoch and signs its body checksum.
//!
//! ```text
//! FinalizationComplete ──→ CouncilService ──council.claim──→ peers
//!                              │
//!                              ├─ archive → decode → checksum
//!                              │     ├── match:    council.vouch ──→ peers
//!                              │     └── mismatch: council.dispute ──→ peers
//!                              │
//!   peers ──council.vouch──→ EpochQuorum ──threshold──→ HardFinal
//!                                                         ├─ mark archive
//!                                                         └─ QuorumAuthenticated
//! ```
//!
//! Council membership is derived from the epoch's chain link, so every
//! peer computes the same council without coordination. Peer ids are
//! Ed25519 public keys; signatures verify against them directly.

pub mod adapters;
pub mod domain;
pub mod error;
pub mod ports;
pub mod service;

pub use adapters::{Ed25519ChecksumSigner, Ed25519VouchVerifier};
pub use domain::{
    council_seed, dispute_message, select_council, shuffle_with_seed, vouch_message,
    BeheadingClaim, DisputeNotice, DisputeRecord, EpochQuorum, QuorumSnapshot, QuorumStatus,
    Vouch, VouchOutcome, VouchRejection, CLAIM_TOPIC, DISPUTE_TOPIC, VOUCH_TOPIC,
};
pub use error::{CouncilError, CouncilResult};
pub use ports::{ChecksumSigner, CouncilApi, CouncilArchive, VouchVerifier};
pub use service::{CouncilConfig, CouncilService};
