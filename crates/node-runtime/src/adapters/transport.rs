//! # Loopback Transport
//!
//! In-process `PeerTransport` connecting any number of peers in one
//! process. Delivery is inline: `broadcast` and `send` return once every
//! recipient handler has run.
//!
//! Offline peers neither send nor receive. The roster is whoever joined.

use async_trait::async_trait;
use parking_lot::RwLock;
use shared_types::{PeerId, PeerTransport, TopicHandler, TransportError};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, trace};

#[derive(Default)]
struct PeerSlot {
    online: bool,
    handlers: HashMap<String, Arc<dyn TopicHandler>>,
}

#[derive(Default)]
struct NetworkState {
    peers: BTreeMap<PeerId, PeerSlot>,
}

impl NetworkState {
    fn is_online(&self, peer: &PeerId) -> bool {
        self.peers.get(peer).is_some_and(|slot| slot.online)
    }
}

/// Shared medium for loopback transports.
#[derive(Clone, Default)]
pub struct LoopbackNetwork {
    state: Arc<RwLock<NetworkState>>,
}

impl LoopbackNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `peer` (online) and return its transport.
    pub fn join(&self, peer: PeerId) -> LoopbackTransport {
        self.state.write().peers.entry(peer).or_default().online = true;
        debug!(peer = %peer.short(), "[node] Peer joined loopback network");
        LoopbackTransport {
            local: peer,
            state: Arc::clone(&self.state),
        }
    }

    pub fn set_online(&self, peer: &PeerId, online: bool) {
        if let Some(slot) = self.state.write().peers.get_mut(peer) {
            slot.online = online;
        }
    }

    pub fn peers(&self) -> Vec<PeerId> {
        self.state.read().peers.keys().copied().collect()
    }
}

/// One peer's view of a `LoopbackNetwork`.
#[derive(Clone)]
pub struct LoopbackTransport {
    local: PeerId,
    state: Arc<RwLock<NetworkState>>,
}

impl LoopbackTransport {
    /// Handlers are cloned out so no lock is held while they run.
    fn recipients(&self, topic: &str) -> (usize, Vec<Arc<dyn TopicHandler>>) {
        let state = self.state.read();
        let mut reached = 0;
        let mut handlers = Vec::new();
        for (peer, slot) in &state.peers {
            if *peer == self.local || !slot.online {
                continue;
            }
            reached += 1;
            if let Some(handler) = slot.handlers.get(topic) {
                handlers.push(Arc::clone(handler));
            }
        }
        (reached, handlers)
    }
}

#[async_trait]
impl PeerTransport for LoopbackTransport {
    fn local_peer(&self) -> PeerId {
        self.local
    }

    fn known_peers(&self) -> Vec<PeerId> {
        self.state
            .read()
            .peers
            .keys()
            .filter(|peer| **peer != self.local)
            .copied()
            .collect()
    }

    async fn broadcast(&self, topic: &str, payload: Vec<u8>) -> Result<usize, TransportError> {
        if !self.state.read().is_online(&self.local) {
            trace!(topic, "[node] Offline, broadcast dropped");
            return Ok(0);
        }
        let (reached, handlers) = self.recipients(topic);
        for handler in handlers {
            handler.on_message(self.local, payload.clone()).await;
        }
        Ok(reached)
    }

    async fn send(
        &self,
        peer: &PeerId,
        topic: &str,
        payload: Vec<u8>,
    ) -> Result<(), TransportError> {
        let handler = {
            let state = self.state.read();
            if !state.is_online(&self.local) || !state.is_online(peer) {
                return Err(TransportError::PeerUnreachable(peer.short()));
            }
            state
                .peers
                .get(peer)
                .and_then(|slot| slot.handlers.get(topic))
                .cloned()
        };
        match handler {
            Some(handler) => handler.on_message(self.local, payload).await,
            None => trace!(peer = %peer.short(), topic, "[node] No handler for topic"),
        }
        Ok(())
    }

    fn register_handler(&self, topic: &str, handler: Arc<dyn TopicHandler>) {
        self.state
            .write()
            .peers
            .entry(self.local)
            .or_default()
            .handlers
            .insert(topic.to_string(), handler);
    }
}
