//! Ports for the Peer Council.

pub mod inbound;
pub mod outbound;

pub use inbound::CouncilApi;
pub use outbound::{ChecksumSigner, CouncilArchive, VouchVerifier};
