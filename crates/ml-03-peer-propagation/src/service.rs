//! Peer Propagation service
//!
//! Keeps live stats roughly in sync across the swarm. Head comparison is
//! advisory: the local Head is never modified from here.

use crate::adapters::{HeadUpdateHandler, SyncRequestHandler};
use crate::domain::messages::encode;
use crate::domain::{
    compare_heads, DivergenceLog, DivergenceRecord, HeadComparison, HeadUpdate, PendingSyncs,
    SyncRequest, HEAD_UPDATE_TOPIC, SYNC_REQUEST_TOPIC,
};
use crate::error::{PropagationError, PropagationResult};
use crate::ports::{LocalHeadProvider, PropagationApi};
use async_trait::async_trait;
use ml_01_epoch_clock::EpochClock;
use parking_lot::Mutex;
use shared_bus::{EventFilter, EventPublisher, EventTopic, InMemoryEventBus, LedgerEvent};
use shared_types::{short_hash, HeadSnapshot, PeerId, PeerTransport};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tokio_stream::StreamExt;
use tracing::{debug, info, warn};

/// Propagation configuration
#[derive(Clone, Debug)]
pub struct PropagationConfig {
    /// Bounded wait for a sync reply.
    pub sync_timeout: Duration,
    /// Peers remembered in the divergence log.
    pub divergence_history: usize,
}

impl Default for PropagationConfig {
    fn default() -> Self {
        Self {
            sync_timeout: Duration::from_secs(3),
            divergence_history: 256,
        }
    }
}

/// Head broadcast, sync request/reply and divergence tracking.
pub struct PropagationService<H: LocalHeadProvider + 'static> {
    transport: Arc<dyn PeerTransport>,
    heads: Arc<H>,
    bus: Arc<InMemoryEventBus>,
    clock: EpochClock,
    config: PropagationConfig,
    pending: PendingSyncs,
    divergences: Mutex<DivergenceLog>,
}

impl<H: LocalHeadProvider + 'static> PropagationService<H> {
    pub fn new(
        transport: Arc<dyn PeerTransport>,
        heads: Arc<H>,
        bus: Arc<InMemoryEventBus>,
        clock: EpochClock,
        config: PropagationConfig,
    ) -> Self {
        let divergences = Mutex::new(DivergenceLog::new(config.divergence_history));
        Self {
            transport,
            heads,
            bus,
            clock,
            config,
            pending: PendingSyncs::new(),
            divergences,
        }
    }

    /// Attach the head-update and sync-request handlers to the transport.
    pub fn register_handlers(self: &Arc<Self>) {
        self.transport.register_handler(
            HEAD_UPDATE_TOPIC,
            Arc::new(HeadUpdateHandler::new(Arc::downgrade(self))),
        );
        self.transport.register_handler(
            SYNC_REQUEST_TOPIC,
            Arc::new(SyncRequestHandler::new(Arc::downgrade(self))),
        );
    }

    /// Forward every `HeadUpdated` bus event to the swarm until shutdown.
    pub fn spawn_head_broadcaster(self: &Arc<Self>, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        let mut heads = self
            .bus
            .event_stream(EventFilter::topics(vec![EventTopic::Ledger]));
        let service = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    event = heads.next() => match event {
                        Some(LedgerEvent::HeadUpdated(head)) => {
                            if let Err(e) = service.broadcast_head(head).await {
                                debug!(error = %e, "[ml-03] Head broadcast failed");
                            }
                        }
                        Some(_) => {}
                        None => break,
                    },
                    _ = shutdown.changed() => break,
                }
            }
            debug!("[ml-03] Head broadcaster stopped");
        })
    }

    /// Sync with every known peer concurrently. Called once after start-up.
    pub async fn sync_with_known_peers(
        self: &Arc<Self>,
    ) -> Vec<(PeerId, PropagationResult<HeadComparison>)> {
        let mut tasks = JoinSet::new();
        for peer in self.transport.known_peers() {
            let service = Arc::clone(self);
            tasks.spawn(async move { (peer, service.request_sync(peer).await) });
        }

        let mut results = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            if let Ok(result) = joined {
                results.push(result);
            }
        }

        let reached = results.iter().filter(|(_, r)| r.is_ok()).count();
        info!(
            peers = results.len(),
            reached,
            "[ml-03] Start-up sync finished"
        );
        results
    }

    pub fn pending_syncs(&self) -> usize {
        self.pending.len()
    }

    async fn observe(&self, from: PeerId, peer_head: &HeadSnapshot) -> HeadComparison {
        let local = self.heads.head_snapshot();
        let comparison = compare_heads(&local, peer_head);

        match comparison {
            HeadComparison::EpochMismatch { local, peer } => {
                debug!(from = %from.short(), %local, %peer, "[ml-03] Discarding head from other epoch");
            }
            HeadComparison::InSync | HeadComparison::PeerBehind { .. } => {
                debug!(from = %from.short(), ?comparison, "[ml-03] Peer head received");
            }
            HeadComparison::PeerAhead { .. } | HeadComparison::Conflicting { .. } => {
                // TODO: request the body slice since our match count from peers
                // that are ahead, once the sink accepts matches from other hosts.
                warn!(
                    from = %from.short(),
                    epoch = %local.epoch_id,
                    local_count = local.match_count,
                    peer_count = peer_head.match_count,
                    peer_head = %short_hash(&peer_head.head_hash),
                    "[ml-03] Divergence observed, reconciliation needed"
                );
                let record = DivergenceRecord {
                    peer: from,
                    epoch_id: local.epoch_id,
                    local_count: local.match_count,
                    peer_count: peer_head.match_count,
                    peer_head_hash: peer_head.head_hash,
                    comparison,
                    observed_at: self.clock.now_ms().unwrap_or(local.last_updated),
                };
                {
                    let mut log = self.divergences.lock();
                    log.prune_before(local.epoch_id);
                    log.record(record);
                }
                self.bus
                    .publish(LedgerEvent::DivergenceObserved {
                        peer: from,
                        epoch_id: local.epoch_id,
                        local_count: local.match_count,
                        peer_count: peer_head.match_count,
                    })
                    .await;
            }
        }
        comparison
    }
}

#[async_trait]
impl<H: LocalHeadProvider + 'static> PropagationApi for PropagationService<H> {
    async fn broadcast_head(&self, head: HeadSnapshot) -> PropagationResult<usize> {
        let payload = encode(&HeadUpdate {
            head,
            in_reply_to: None,
        })?;
        let reached = self.transport.broadcast(HEAD_UPDATE_TOPIC, payload).await?;
        debug!(reached, "[ml-03] Head broadcast");
        Ok(reached)
    }

    async fn request_sync(&self, peer: PeerId) -> PropagationResult<HeadComparison> {
        let epoch_id = self.heads.head_snapshot().epoch_id;
        let (request_id, reply) = self.pending.register(peer);
        let payload = encode(&SyncRequest {
            request_id,
            epoch_id,
        })?;

        if let Err(e) = self.transport.send(&peer, SYNC_REQUEST_TOPIC, payload).await {
            self.pending.cancel(request_id);
            return Err(e.into());
        }

        let head = match tokio::time::timeout(self.config.sync_timeout, reply).await {
            Ok(Ok(head)) => head,
            Ok(Err(_)) => {
                self.pending.cancel(request_id);
                return Err(PropagationError::SyncCancelled { request_id });
            }
            Err(_) => {
                self.pending.cancel(request_id);
                warn!(peer = %peer.short(), "[ml-03] Sync request timed out");
                return Err(PropagationError::SyncTimeout {
                    peer,
                    waited_ms: self.config.sync_timeout.as_millis() as u64,
                });
            }
        };

        Ok(self.observe(peer, &head).await)
    }

    async fn handle_head_update(&self, from: PeerId, update: HeadUpdate) -> HeadComparison {
        if let Some(request_id) = update.in_reply_to {
            // Replies are classified by the waiting `request_sync` call.
            if self.pending.complete(request_id, from, update.head.clone()) {
                return compare_heads(&self.heads.head_snapshot(), &update.head);
            }
        }
        self.observe(from, &update.head).await
    }

    async fn handle_sync_request(
        &self,
        from: PeerId,
        request: SyncRequest,
    ) -> PropagationResult<()> {
        let head = self.heads.head_snapshot();
        if head.epoch_id != request.epoch_id {
            debug!(
                from = %from.short(),
                ours = %head.epoch_id,
                theirs = %request.epoch_id,
                "[ml-03] Answering sync request across epochs"
            );
        }
        let payload = encode(&HeadUpdate {
            head,
            in_reply_to: Some(request.request_id),
        })?;
        self.transport.send(&from, HEAD_UPDATE_TOPIC, payload).await?;
        Ok(())
    }

    fn divergences(&self) -> Vec<DivergenceRecord> {
        self.divergences.lock().entries()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::messages::decode;
    use ml_01_epoch_clock::{ManualTimeSource, DEFAULT_FINALIZATION_WINDOW};
    use shared_types::{EpochId, TopicHandler, TransportError};

    const NOON_MS: u64 = 1_735_732_800_000;

    struct FixedHead(Mutex<HeadSnapshot>);

    impl LocalHeadProvider for FixedHead {
        fn head_snapshot(&self) -> HeadSnapshot {
            self.0.lock().clone()
        }
    }

    /// Records outbound traffic; never delivers anything by itself.
    #[derive(Default)]
    struct RecordingTransport {
        sent: Mutex<Vec<(PeerId, String, Vec<u8>)>>,
        broadcasts: Mutex<Vec<(String, Vec<u8>)>>,
        peers: Vec<PeerId>,
        offline: bool,
    }

    #[async_trait]
    impl PeerTransport for RecordingTransport {
        fn local_peer(&self) -> PeerId {
            PeerId([0u8; 32])
        }

        fn known_peers(&self) -> Vec<PeerId> {
            self.peers.clone()
        }

        async fn broadcast(&self, topic: &str, payload: Vec<u8>) -> Result<usize, TransportError> {
            self.broadcasts.lock().push((topic.to_string(), payload));
            Ok(self.peers.len())
        }

        async fn send(
            &self,
            peer: &PeerId,
            topic: &str,
            payload: Vec<u8>,
        ) -> Result<(), TransportError> {
            if self.offline {
                return Err(TransportError::PeerUnreachable(peer.short()));
            }
            self.sent.lock().push((*peer, topic.to_string(), payload));
            Ok(())
        }

        fn register_handler(&self, _topic: &str, _handler: Arc<dyn TopicHandler>) {}
    }

    fn head(count: u64, hash: u8) -> HeadSnapshot {
        HeadSnapshot {
            epoch_id: EpochId::parse("2025-01-01").unwrap(),
            head_hash: [hash; 32],
            previous_head_hash: None,
            match_count: count,
            total_players: count * 2,
            total_time_played: 0,
            created_at: 0,
            last_updated: 0,
        }
    }

    fn service(
        transport: RecordingTransport,
        local: HeadSnapshot,
    ) -> (
        Arc<PropagationService<FixedHead>>,
        Arc<RecordingTransport>,
        Arc<InMemoryEventBus>,
    ) {
        let transport = Arc::new(transport);
        let bus = Arc::new(InMemoryEventBus::new());
        let clock = EpochClock::new(
            Arc::new(ManualTimeSource::new(NOON_MS)),
            DEFAULT_FINALIZATION_WINDOW,
        );
        let config = PropagationConfig {
            sync_timeout: Duration::from_millis(200),
            divergence_history: 16,
        };
        let service = Arc::new(PropagationService::new(
            transport.clone(),
            Arc::new(FixedHead(Mutex::new(local))),
            bus.clone(),
            clock,
            config,
        ));
        (service, transport, bus)
    }

    #[tokio::test]
    async fn test_peer_ahead_logged_without_mutation() {
        let local = head(10, 1);
        let (service, _, bus) = service(RecordingTransport::default(), local.clone());
        let mut events = bus.subscribe(EventFilter::all());
        let peer = PeerId([9u8; 32]);

        let comparison = service
            .handle_head_update(
                peer,
                HeadUpdate {
                    head: head(14, 2),
                    in_reply_to: None,
                },
            )
            .await;

        assert_eq!(
            comparison,
            HeadComparison::PeerAhead {
                local_count: 10,
                peer_count: 14
            }
        );
        assert_eq!(service.heads.head_snapshot(), local);

        let divergences = service.divergences();
        assert_eq!(divergences.len(), 1);
        assert_eq!(divergences[0].peer, peer);
        assert_eq!(divergences[0].peer_count, 14);
        assert_eq!(divergences[0].observed_at, NOON_MS);

        assert!(matches!(
            events.try_recv(),
            Ok(Some(LedgerEvent::DivergenceObserved {
                local_count: 10,
                peer_count: 14,
                ..
            }))
        ));
    }

    #[tokio::test]
    async fn test_other_epoch_discarded() {
        let (service, _, _) = service(RecordingTransport::default(), head(1, 1));
        let mut other = head(50, 2);
        other.epoch_id = EpochId::parse("2025-01-02").unwrap();

        let comparison = service
            .handle_head_update(
                PeerId([9u8; 32]),
                HeadUpdate {
                    head: other,
                    in_reply_to: None,
                },
            )
            .await;

        assert!(matches!(comparison, HeadComparison::EpochMismatch { .. }));
        assert!(service.divergences().is_empty());
    }

    #[tokio::test]
    async fn test_sync_request_answered_with_local_head() {
        let local = head(3, 1);
        let (service, transport, _) = service(RecordingTransport::default(), local.clone());
        let peer = PeerId([9u8; 32]);

        service
            .handle_sync_request(
                peer,
                SyncRequest {
                    request_id: 42,
                    epoch_id: local.epoch_id,
                },
            )
            .await
            .unwrap();

        let sent = transport.sent.lock();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, peer);
        assert_eq!(sent[0].1, HEAD_UPDATE_TOPIC);
        let reply: HeadUpdate = decode(&sent[0].2).unwrap();
        assert_eq!(reply.in_reply_to, Some(42));
        assert_eq!(reply.head, local);
    }

    #[tokio::test]
    async fn test_request_sync_receives_reply() {
        let (service, transport, _) = service(RecordingTransport::default(), head(10, 1));
        let peer = PeerId([9u8; 32]);

        let responder = {
            let service = service.clone();
            let transport = transport.clone();
            tokio::spawn(async move {
                loop {
                    let request = transport.sent.lock().first().cloned();
                    if let Some((_, _, payload)) = request {
                        let request: SyncRequest = decode(&payload).unwrap();
                        service
                            .handle_head_update(
                                peer,
                                HeadUpdate {
                                    head: head(14, 2),
                                    in_reply_to: Some(request.request_id),
                                },
                            )
                            .await;
                        return;
                    }
                    tokio::time::sleep(Duration::from_millis(1)).await;
                }
            })
        };

        let comparison = service.request_sync(peer).await.unwrap();
        responder.await.unwrap();

        assert!(matches!(comparison, HeadComparison::PeerAhead { .. }));
        assert_eq!(service.pending_syncs(), 0);
        assert_eq!(service.divergences().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_sync_times_out() {
        let (service, _, _) = service(RecordingTransport::default(), head(1, 1));

        let result = service.request_sync(PeerId([9u8; 32])).await;

        assert!(matches!(result, Err(PropagationError::SyncTimeout { .. })));
        assert_eq!(service.pending_syncs(), 0);
    }

    #[tokio::test]
    async fn test_unreachable_peer_fails_fast() {
        let transport = RecordingTransport {
            offline: true,
            ..RecordingTransport::default()
        };
        let (service, _, _) = service(transport, head(1, 1));

        let result = service.request_sync(PeerId([9u8; 32])).await;
        assert!(matches!(result, Err(PropagationError::Transport(_))));
        assert_eq!(service.pending_syncs(), 0);
    }

    #[tokio::test]
    async fn test_broadcaster_forwards_head_updates() {
        let transport = RecordingTransport {
            peers: vec![PeerId([1u8; 32]), PeerId([2u8; 32])],
            ..RecordingTransport::default()
        };
        let (service, transport, bus) = service(transport, head(0, 1));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = service.spawn_head_broadcaster(shutdown_rx);

        bus.publish(LedgerEvent::HeadUpdated(head(1, 3))).await;
        for _ in 0..100 {
            if !transport.broadcasts.lock().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }

        let _ = shutdown_tx.send(true);
        task.await.unwrap();

        let broadcasts = transport.broadcasts.lock();
        assert_eq!(broadcasts.len(), 1);
        let update: HeadUpdate = decode(&broadcasts[0].1).unwrap();
        assert_eq!(update.head.match_count, 1);
        assert_eq!(update.in_reply_to, None);
    }
}
