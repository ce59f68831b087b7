//! # Shared Types Crate
//!
//! This crate contains the ledger entities and port contracts that cross
//! subsystem boundaries.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: All cross-subsystem types are defined here.
//! - **Deterministic encodings**: every type that feeds a hash uses ordered
//!   containers (`BTreeMap`) so two peers serialize identical bytes.
//! - **Soft vs hard state**: `HeadSnapshot` is live, unauthenticated data;
//!   `BeheadingResult` is the only value that can become hard-final.

pub mod archive;
pub mod entities;
pub mod errors;
pub mod ledger;
pub mod transport;

pub use archive::*;
pub use entities::*;
pub use errors::*;
pub use ledger::*;
pub use transport::{PeerTransport, TopicHandler};
