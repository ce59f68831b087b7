//! Adapters for the Peer Council.

pub mod signing;
pub mod transport;

pub use signing::{Ed25519ChecksumSigner, Ed25519VouchVerifier};
pub use transport::{ClaimHandler, DisputeHandler, VouchHandler};
