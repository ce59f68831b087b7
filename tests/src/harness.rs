//! # Swarm Harness
//!
//! Starts several `LedgerNode`s on one `LoopbackNetwork`, sharing a manual
//! clock. Each peer gets its own `FaultySink` so tests can fail writes or
//! hand the council a tampered archive.

use async_trait::async_trait;
use ml_01_epoch_clock::{EpochClock, ManualTimeSource};
use ml_02_ledger_store::{MatchSink, RetryPolicy};
use ml_04_beheading::{MorgueCodec, MorgueReader, MorgueWriter};
use ml_05_peer_council::CouncilArchive;
use node_runtime::{
    InMemoryLedgerSink, LedgerNode, LoopbackNetwork, NodeConfig, NodeResult, TickReport,
};
use shared_crypto::Ed25519KeyPair;
use shared_types::{
    ArchiveAuthentication, ArchiveRecord, EpochId, Hash, MatchRecord, MorgueId, PeerId, SinkError,
    StoredArchive,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// 2025-01-01T23:50:00Z
pub const START_MS: u64 = 1_735_775_400_000;

/// 2025-01-02T00:01:00Z
pub const AFTER_MIDNIGHT_MS: u64 = 1_735_776_060_000;

pub const FIRST_EPOCH: &str = "2025-01-01";
pub const SECOND_EPOCH: &str = "2025-01-02";

pub fn epoch(s: &str) -> EpochId {
    EpochId::parse(s).unwrap()
}

/// In-memory sink with switchable faults.
pub struct FaultySink {
    inner: InMemoryLedgerSink,
    fail_writes: AtomicBool,
    tamper_archives: AtomicBool,
    codec: MorgueCodec,
}

impl FaultySink {
    pub fn new(codec: MorgueCodec) -> Self {
        Self {
            inner: InMemoryLedgerSink::in_memory(),
            fail_writes: AtomicBool::new(false),
            tamper_archives: AtomicBool::new(false),
            codec,
        }
    }

    pub fn inner(&self) -> &InMemoryLedgerSink {
        &self.inner
    }

    /// Match upserts fail with a transient error.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// The council sees archives with a forged extra match.
    pub fn set_tamper_archives(&self, tamper: bool) {
        self.tamper_archives.store(tamper, Ordering::SeqCst);
    }

    fn tamper(&self, mut archive: StoredArchive) -> Result<StoredArchive, SinkError> {
        let mut matches = self
            .codec
            .decode(&archive.record.compressed_body)
            .map_err(|e| SinkError::Corrupt(e.to_string()))?;
        matches.push(
            MatchRecord::new("forged", "void", vec!["mallory".into()], 0, 1, PeerId::default())
                .sealed()
                .map_err(|e| SinkError::Corrupt(e.to_string()))?,
        );
        archive.record.compressed_body = self
            .codec
            .encode(&matches)
            .map_err(|e| SinkError::Corrupt(e.to_string()))?
            .bytes;
        Ok(archive)
    }
}

#[async_trait]
impl MatchSink for FaultySink {
    async fn upsert_match(&self, record: &MatchRecord) -> Result<(), SinkError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(SinkError::Unavailable("injected write failure".into()));
        }
        self.inner.upsert_match(record).await
    }

    async fn latest_archived_head_hash(&self) -> Result<Option<Hash>, SinkError> {
        self.inner.latest_archived_head_hash().await
    }
}

#[async_trait]
impl MorgueWriter for FaultySink {
    async fn insert_archive(&self, record: ArchiveRecord) -> Result<MorgueId, SinkError> {
        self.inner.insert_archive(record).await
    }
}

#[async_trait]
impl MorgueReader for FaultySink {
    async fn archive_by_epoch(&self, epoch_id: &EpochId) -> Result<Option<StoredArchive>, SinkError> {
        MorgueReader::archive_by_epoch(&self.inner, epoch_id).await
    }

    async fn list_archives(&self, limit: usize) -> Result<Vec<StoredArchive>, SinkError> {
        self.inner.list_archives(limit).await
    }
}

#[async_trait]
impl CouncilArchive for FaultySink {
    async fn archive_by_epoch(&self, epoch_id: &EpochId) -> Result<Option<StoredArchive>, SinkError> {
        let archive = CouncilArchive::archive_by_epoch(&self.inner, epoch_id).await?;
        match archive {
            Some(archive) if self.tamper_archives.load(Ordering::SeqCst) => {
                self.tamper(archive).map(Some)
            }
            other => Ok(other),
        }
    }

    async fn mark_authenticated(
        &self,
        epoch_id: &EpochId,
        authentication: ArchiveAuthentication,
    ) -> Result<(), SinkError> {
        self.inner.mark_authenticated(epoch_id, authentication).await
    }
}

pub struct SwarmPeer {
    pub id: PeerId,
    pub node: Arc<LedgerNode<FaultySink>>,
    pub sink: Arc<FaultySink>,
}

/// Several peers on one loopback network and one manual clock.
pub struct Swarm {
    pub network: LoopbackNetwork,
    pub time: Arc<ManualTimeSource>,
    pub peers: Vec<SwarmPeer>,
}

impl Swarm {
    /// Quiet background loop, fast sync timeout, no write retries.
    pub fn test_config() -> NodeConfig {
        let mut config = NodeConfig::default();
        config.epoch.poll_interval = Duration::from_secs(3600);
        config.propagation.sync_timeout = Duration::from_millis(500);
        config.ledger.retry = RetryPolicy::none();
        config
    }

    pub fn keypair(index: usize) -> Ed25519KeyPair {
        Ed25519KeyPair::from_seed([index as u8 + 1; 32])
    }

    pub fn peer_id(index: usize) -> PeerId {
        PeerId(*Self::keypair(index).public_key().as_bytes())
    }

    /// Join and start peers one at a time, so each start-up sync only
    /// reaches peers that are already serving.
    pub async fn start(size: usize, config: NodeConfig) -> Self {
        let mut swarm = Self {
            network: LoopbackNetwork::new(),
            time: Arc::new(ManualTimeSource::new(START_MS)),
            peers: Vec::with_capacity(size),
        };
        for _ in 0..size {
            swarm.join(config.clone()).await.unwrap();
        }
        debug!(size, "Swarm started");
        swarm
    }

    /// Start one more peer on the shared network and clock. Its start-up
    /// sync runs against every peer already joined. Returns its index.
    pub async fn join(&mut self, config: NodeConfig) -> NodeResult<usize> {
        let index = self.peers.len();
        let id = Self::peer_id(index);
        let transport = Arc::new(self.network.join(id));
        let sink = Arc::new(FaultySink::new(MorgueCodec::new(
            config.morgue.compression_level,
        )));
        let clock = EpochClock::new(self.time.clone(), config.epoch.finalization_window);
        let node = LedgerNode::start_with_clock(
            config,
            Self::keypair(index),
            Arc::clone(&sink),
            transport,
            clock,
        )
        .await?;
        self.peers.push(SwarmPeer {
            id,
            node: Arc::new(node),
            sink,
        });
        Ok(index)
    }

    pub fn peer(&self, index: usize) -> &SwarmPeer {
        &self.peers[index]
    }

    pub fn advance_past_midnight(&self) {
        self.time.set(AFTER_MIDNIGHT_MS);
    }

    /// Tick the given peers in order.
    pub async fn tick(&self, order: &[usize]) -> Vec<TickReport> {
        let mut reports = Vec::with_capacity(order.len());
        for &index in order {
            reports.push(self.peers[index].node.tick().await);
        }
        reports
    }

    pub async fn shutdown(&self) {
        for peer in &self.peers {
            peer.node.shutdown().await;
        }
    }
}

/// A sealed two-player match hosted by `host`.
pub fn sample_match(id: &str, host: PeerId) -> MatchRecord {
    MatchRecord::new(
        id,
        "arena",
        vec!["alice".into(), "bob".into()],
        START_MS,
        START_MS + 90_000,
        host,
    )
    .with_score("alice", 3)
    .with_score("bob", 1)
    .with_winner("alice")
    .sealed()
    .unwrap()
}
