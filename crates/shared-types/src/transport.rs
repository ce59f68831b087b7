//! # Peer Transport Port
//!
//! The transport collaborator: reliable delivery to named peers and
//! best-effort broadcast. Discovery and NAT traversal live behind it.

use crate::entities::PeerId;
use crate::errors::TransportError;
use async_trait::async_trait;
use std::sync::Arc;

/// Callback for inbound messages on one topic.
#[async_trait]
pub trait TopicHandler: Send + Sync {
    async fn on_message(&self, from: PeerId, payload: Vec<u8>);
}

/// Peer-to-peer messaging used by propagation and the council.
#[async_trait]
pub trait PeerTransport: Send + Sync {
    /// Identity of the local peer on this transport.
    fn local_peer(&self) -> PeerId;

    /// Peers currently known to the transport, excluding the local peer.
    fn known_peers(&self) -> Vec<PeerId>;

    /// Best-effort send to every known peer. Returns the number reached.
    async fn broadcast(&self, topic: &str, payload: Vec<u8>) -> Result<usize, TransportError>;

    /// Reliable point-to-point send.
    async fn send(&self, peer: &PeerId, topic: &str, payload: Vec<u8>)
        -> Result<(), TransportError>;

    /// Route inbound messages on `topic` to `handler`, replacing any previous one.
    fn register_handler(&self, topic: &str, handler: Arc<dyn TopicHandler>);
}
