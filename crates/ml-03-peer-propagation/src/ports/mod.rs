//! Ports for Peer Propagation.

pub mod inbound;
pub mod outbound;

pub use inbound::PropagationApi;
pub use outbound::LocalHeadProvider;
