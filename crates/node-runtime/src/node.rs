//! # Ledger Node
//!
//! Lifecycle for one peer: build the container, start the background
//! loops, expose ingestion and ticks, stop everything on shutdown.
//!
//! Background tasks:
//! - head broadcaster (`HeadUpdated` → `ledger.head-update`)
//! - clock loop (`tick()` every `epoch.poll_interval`)

use crate::container::{LedgerContainer, LedgerSink, NodeConfig, TickReport};
use crate::error::NodeResult;
use ml_01_epoch_clock::{EpochClock, SystemTimeSource};
use ml_02_ledger_store::{Durability, IngestReceipt, IngestionApi, LedgerResult};
use parking_lot::Mutex;
use shared_crypto::Ed25519KeyPair;
use shared_types::{MatchRecord, PeerTransport};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// A running ledger peer.
pub struct LedgerNode<S: LedgerSink> {
    container: Arc<LedgerContainer<S>>,
    shutdown_tx: watch::Sender<bool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl<S: LedgerSink> LedgerNode<S> {
    /// Start on the system clock.
    pub async fn start(
        config: NodeConfig,
        keypair: Ed25519KeyPair,
        sink: Arc<S>,
        transport: Arc<dyn PeerTransport>,
    ) -> NodeResult<Self> {
        let clock = EpochClock::new(Arc::new(SystemTimeSource), config.epoch.finalization_window);
        Self::start_with_clock(config, keypair, sink, transport, clock).await
    }

    /// Start on an explicit clock.
    pub async fn start_with_clock(
        config: NodeConfig,
        keypair: Ed25519KeyPair,
        sink: Arc<S>,
        transport: Arc<dyn PeerTransport>,
        clock: EpochClock,
    ) -> NodeResult<Self> {
        config.validate()?;
        let sync_on_startup = config.network.sync_on_startup;
        let poll_interval = config.epoch.poll_interval;

        let container = Arc::new(LedgerContainer::build(config, keypair, sink, transport, clock).await?);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let broadcaster = container.propagation.spawn_head_broadcaster(shutdown_rx.clone());
        let clock_loop = Self::spawn_clock_loop(Arc::clone(&container), poll_interval, shutdown_rx);

        if sync_on_startup {
            for (peer, result) in container.propagation.sync_with_known_peers().await {
                if let Err(e) = result {
                    debug!(peer = %peer.short(), error = %e, "[node] Start-up sync failed");
                }
            }
        }

        info!(
            peer = %container.transport.local_peer().short(),
            epoch = %container.store().epoch_id(),
            "[node] Ledger node started"
        );

        Ok(Self {
            container,
            shutdown_tx,
            tasks: Mutex::new(vec![broadcaster, clock_loop]),
        })
    }

    fn spawn_clock_loop(
        container: Arc<LedgerContainer<S>>,
        poll_interval: std::time::Duration,
        mut shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + poll_interval, poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let report = container.tick().await;
                        if let Some(result) = &report.finalized {
                            info!(epoch = %result.epoch_id, "[node] Epoch rolled over");
                        }
                    }
                    _ = shutdown.changed() => break,
                }
            }
            debug!("[node] Clock loop stopped");
        })
    }

    pub fn container(&self) -> &LedgerContainer<S> {
        &self.container
    }

    /// Append a completed match to the live epoch.
    pub async fn record_match(
        &self,
        record: MatchRecord,
        durability: Durability,
    ) -> LedgerResult<IngestReceipt> {
        self.container.ingestion.record_match(record, durability).await
    }

    /// Run one clock tick now, outside the background loop.
    pub async fn tick(&self) -> TickReport {
        self.container.tick().await
    }

    /// Stop the background tasks and wait for them to exit.
    pub async fn shutdown(&self) {
        info!("[node] Shutting down");
        let _ = self.shutdown_tx.send(true);
        let tasks: Vec<JoinHandle<()>> = self.tasks.lock().drain(..).collect();
        for task in tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "[node] Background task ended abnormally");
            }
        }
    }
}
