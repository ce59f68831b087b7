//! # Ledger Container
//!
//! Holds one peer's subsystem services, wired over a shared sink,
//! transport, clock and event bus.
//!
//! ## Wiring Order
//!
//! ```text
//! [01] EpochClock      (given)
//! [02] Ingestion       sink → latest archived head → LedgerStore
//! [03] Propagation     transport + LedgerStore
//! [04] Beheading       LedgerStore + sink (MorgueWriter), MorgueQuery (MorgueReader)
//! [05] Council         transport + sink (CouncilArchive) + Ed25519 identity
//! ```
//!
//! Every service is `Arc`-shared; transport handlers hold weak references.

use crate::container::config::NodeConfig;
use crate::error::{NodeError, NodeResult};
use ml_01_epoch_clock::EpochClock;
use ml_02_ledger_store::{FlushReport, IngestionService, LedgerStore, MatchSink};
use ml_03_peer_propagation::PropagationService;
use ml_04_beheading::{
    BeheadingApi, BeheadingService, MorgueCodec, MorgueQueryService, MorgueReader, MorgueWriter,
};
use ml_05_peer_council::{
    ChecksumSigner, CouncilApi, CouncilArchive, CouncilService, Ed25519ChecksumSigner,
    Ed25519VouchVerifier,
};
use shared_bus::{EventPublisher, InMemoryEventBus};
use shared_crypto::Ed25519KeyPair;
use shared_types::{BeheadingResult, PeerTransport};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Everything the durable sink must provide to a full node.
pub trait LedgerSink: MatchSink + MorgueWriter + MorgueReader + CouncilArchive + 'static {}

impl<T> LedgerSink for T where T: MatchSink + MorgueWriter + MorgueReader + CouncilArchive + 'static
{}

/// What one clock tick did.
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    /// Epoch finalized on this tick, if any.
    pub finalized: Option<BeheadingResult>,
    /// Rollover was due but failed; the old epoch stays live.
    pub finalization_failed: bool,
    pub flushed: FlushReport,
    /// Council verifications and archive marks retried.
    pub council_retries: usize,
}

/// One peer's wired subsystems.
pub struct LedgerContainer<S: LedgerSink> {
    pub config: NodeConfig,
    pub clock: EpochClock,
    pub bus: Arc<InMemoryEventBus>,
    pub transport: Arc<dyn PeerTransport>,
    pub sink: Arc<S>,
    pub ingestion: Arc<IngestionService<S>>,
    pub propagation: Arc<PropagationService<LedgerStore>>,
    pub beheading: Arc<BeheadingService<S>>,
    pub morgue: MorgueQueryService<S>,
    pub council: Arc<CouncilService<S>>,
}

impl<S: LedgerSink> LedgerContainer<S> {
    /// Wire every subsystem and attach transport handlers.
    pub async fn build(
        config: NodeConfig,
        keypair: Ed25519KeyPair,
        sink: Arc<S>,
        transport: Arc<dyn PeerTransport>,
        clock: EpochClock,
    ) -> NodeResult<Self> {
        let signer = Ed25519ChecksumSigner::new(keypair);
        let identity = signer.member();
        if identity != transport.local_peer() {
            return Err(NodeError::IdentityMismatch {
                transport: transport.local_peer().to_string(),
                identity: identity.to_string(),
            });
        }
        info!(peer = %identity.short(), "[node] Wiring ledger subsystems");

        let bus = Arc::new(InMemoryEventBus::new());
        let publisher: Arc<dyn EventPublisher> = bus.clone();

        let ingestion = Arc::new(
            IngestionService::initialize(
                Arc::clone(&sink),
                clock.clone(),
                Arc::clone(&publisher),
                config.ledger.ingestion(),
            )
            .await?,
        );
        let store = Arc::clone(ingestion.store());
        debug!(epoch = %store.epoch_id(), "  [02] Ingestion ready");

        let propagation = Arc::new(PropagationService::new(
            Arc::clone(&transport),
            Arc::clone(&store),
            Arc::clone(&bus),
            clock.clone(),
            config.propagation.clone(),
        ));
        debug!("  [03] Propagation ready");

        let codec = MorgueCodec::new(config.morgue.compression_level);
        let beheading = Arc::new(BeheadingService::new(
            Arc::clone(&store),
            Arc::clone(&sink),
            clock.clone(),
            Arc::clone(&publisher),
            codec,
        ));
        let morgue = MorgueQueryService::new(Arc::clone(&sink), codec, config.morgue.max_page_size);
        debug!(level = codec.level(), "  [04] Beheading ready");

        let council = Arc::new(CouncilService::new(
            Arc::clone(&transport),
            Arc::clone(&sink),
            Arc::new(signer),
            Arc::new(Ed25519VouchVerifier),
            publisher,
            clock.clone(),
            codec,
            config.council.clone(),
        ));
        debug!(
            size = config.council.council_size,
            threshold = config.council.quorum_threshold,
            "  [05] Council ready"
        );

        propagation.register_handlers();
        council.register_handlers();

        Ok(Self {
            config,
            clock,
            bus,
            transport,
            sink,
            ingestion,
            propagation,
            beheading,
            morgue,
            council,
        })
    }

    pub fn store(&self) -> &Arc<LedgerStore> {
        self.ingestion.store()
    }

    /// Rollover check, then pending sink writes, then council retries.
    pub async fn tick(&self) -> TickReport {
        let mut report = TickReport::default();

        match self.beheading.check_rollover().await {
            Ok(Some(result)) => {
                if let Err(e) = self.council.on_local_finalization(result.clone()).await {
                    warn!(epoch = %result.epoch_id, error = %e, "[node] Council start failed");
                }
                report.finalized = Some(result);
            }
            Ok(None) => {}
            Err(e) => {
                // Already logged and announced by the beheading service.
                debug!(error = %e, "[node] Rollover deferred to next tick");
                report.finalization_failed = true;
            }
        }

        report.flushed = self.ingestion.flush_pending().await;
        report.council_retries = self.council.retry_pending().await;
        report
    }
}
