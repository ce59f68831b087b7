//! Match Ingestion service
//!
//! Appends completed matches to the live ledger, announces the new Head on
//! the bus and persists the record to the durable sink. A failed sink write
//! never rolls the ledger back; it is parked and retried on the next tick.

use crate::domain::{AppendOutcome, LedgerStore, RetryPolicy, DEFAULT_DEFERRED_CAPACITY};
use crate::error::LedgerResult;
use crate::ports::inbound::{Durability, IngestReceipt, IngestStatus, IngestionApi};
use crate::ports::outbound::MatchSink;
use async_trait::async_trait;
use ml_01_epoch_clock::EpochClock;
use parking_lot::Mutex;
use shared_bus::{EventPublisher, LedgerEvent};
use shared_types::{HeadSnapshot, MatchRecord, SinkError};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Ingestion configuration
#[derive(Clone, Debug)]
pub struct IngestionConfig {
    /// Backoff for sink writes.
    pub retry: RetryPolicy,
    /// Records buffered while a rollover is in flight.
    pub deferred_capacity: usize,
    /// Failed sink writes kept for the next flush.
    pub max_pending_writes: usize,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            deferred_capacity: DEFAULT_DEFERRED_CAPACITY,
            max_pending_writes: 10_000,
        }
    }
}

/// Result of one pending-queue flush.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    pub persisted: usize,
    pub remaining: usize,
}

/// Sink writes that ran out of retries.
struct PendingWrites {
    queue: VecDeque<MatchRecord>,
    capacity: usize,
}

impl PendingWrites {
    fn push(&mut self, record: MatchRecord) {
        if self.queue.iter().any(|r| r.match_id == record.match_id) {
            return;
        }
        if self.queue.len() >= self.capacity {
            if let Some(dropped) = self.queue.pop_front() {
                error!(
                    match_id = %dropped.match_id,
                    "[ml-02] Pending write queue full, oldest match will not be persisted"
                );
            }
        }
        self.queue.push_back(record);
    }
}

/// Write with backoff. Only transient errors are retried.
pub async fn persist_with_retry<S: MatchSink + ?Sized>(
    sink: &S,
    record: &MatchRecord,
    policy: &RetryPolicy,
) -> Result<(), SinkError> {
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;
    loop {
        match sink.upsert_match(record).await {
            Ok(()) => return Ok(()),
            Err(e) if e.is_transient() && attempt + 1 < max_attempts => {
                let delay = policy.delay_for(attempt);
                debug!(
                    match_id = %record.match_id,
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "[ml-02] Sink write failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Match ingestion over a shared `LedgerStore`.
pub struct IngestionService<S: MatchSink + 'static> {
    store: Arc<LedgerStore>,
    sink: Arc<S>,
    clock: EpochClock,
    bus: Arc<dyn EventPublisher>,
    config: IngestionConfig,
    pending: Arc<Mutex<PendingWrites>>,
}

impl<S: MatchSink + 'static> IngestionService<S> {
    pub fn new(
        store: Arc<LedgerStore>,
        sink: Arc<S>,
        clock: EpochClock,
        bus: Arc<dyn EventPublisher>,
        config: IngestionConfig,
    ) -> Self {
        let pending = PendingWrites {
            queue: VecDeque::new(),
            capacity: config.max_pending_writes.max(1),
        };
        Self {
            store,
            sink,
            clock,
            bus,
            config,
            pending: Arc::new(Mutex::new(pending)),
        }
    }

    /// Build the store for the clock's current epoch, chained to the most
    /// recent archive when the sink can tell us about it.
    ///
    /// An unreachable sink is not fatal: the Head starts without a chain link.
    pub async fn initialize(
        sink: Arc<S>,
        clock: EpochClock,
        bus: Arc<dyn EventPublisher>,
        config: IngestionConfig,
    ) -> LedgerResult<Self> {
        let info = clock.now()?;
        let now = clock.now_ms()?;

        let previous_head_hash = match sink.latest_archived_head_hash().await {
            Ok(hash) => hash,
            Err(e) => {
                warn!(error = %e, "[ml-02] Sink unavailable at startup, starting without chain link");
                None
            }
        };

        info!(
            epoch = %info.epoch_id,
            chained = previous_head_hash.is_some(),
            "[ml-02] Ledger initialized"
        );

        let store = Arc::new(LedgerStore::new(
            info.epoch_id,
            previous_head_hash,
            now,
            config.deferred_capacity,
        ));
        Ok(Self::new(store, sink, clock, bus, config))
    }

    pub fn store(&self) -> &Arc<LedgerStore> {
        &self.store
    }

    pub fn sink(&self) -> &Arc<S> {
        &self.sink
    }

    /// Number of writes waiting for the next flush.
    pub fn pending_writes(&self) -> usize {
        self.pending.lock().queue.len()
    }

    /// Retry every parked write once.
    pub async fn flush_pending(&self) -> FlushReport {
        let batch: Vec<MatchRecord> = self.pending.lock().queue.drain(..).collect();
        if batch.is_empty() {
            return FlushReport::default();
        }

        let mut persisted = 0;
        let mut failed = Vec::new();
        for record in batch {
            match self.sink.upsert_match(&record).await {
                Ok(()) => persisted += 1,
                Err(e) => {
                    debug!(match_id = %record.match_id, error = %e, "[ml-02] Flush write failed");
                    failed.push(record);
                }
            }
        }

        let remaining = {
            let mut pending = self.pending.lock();
            for record in failed {
                pending.push(record);
            }
            pending.queue.len()
        };

        if persisted > 0 || remaining > 0 {
            info!(persisted, remaining, "[ml-02] Flushed pending sink writes");
        }
        FlushReport {
            persisted,
            remaining,
        }
    }

    fn spawn_persist(&self, record: MatchRecord) {
        let sink = self.sink.clone();
        let pending = self.pending.clone();
        let policy = self.config.retry;
        tokio::spawn(async move {
            if let Err(e) = persist_with_retry(sink.as_ref(), &record, &policy).await {
                warn!(match_id = %record.match_id, error = %e, "[ml-02] Persistence failed, queued for retry");
                pending.lock().push(record);
            }
        });
    }
}

#[async_trait]
impl<S: MatchSink + 'static> IngestionApi for IngestionService<S> {
    async fn record_match(
        &self,
        record: MatchRecord,
        durability: Durability,
    ) -> LedgerResult<IngestReceipt> {
        let now = self.clock.now_ms()?;
        let match_id = record.match_id.clone();
        let to_persist = record.clone();

        let (status, head) = match self.store.append(record, now)? {
            AppendOutcome::Applied(snapshot) => {
                debug!(
                    match_id = %match_id,
                    match_count = snapshot.match_count,
                    "[ml-02] Match ingested"
                );
                self.bus
                    .publish(LedgerEvent::HeadUpdated(snapshot.clone()))
                    .await;
                (IngestStatus::IngestedLocally, Some(snapshot))
            }
            AppendOutcome::Deferred { queued } => {
                info!(match_id = %match_id, queued, "[ml-02] Match deferred until rollover completes");
                (IngestStatus::Deferred, None)
            }
        };

        let status = match durability {
            Durability::Local => {
                self.spawn_persist(to_persist);
                status
            }
            Durability::Persisted => {
                match persist_with_retry(self.sink.as_ref(), &to_persist, &self.config.retry).await
                {
                    Ok(()) if status == IngestStatus::IngestedLocally => {
                        IngestStatus::IngestedAndPersisted
                    }
                    Ok(()) => status,
                    Err(e) => {
                        warn!(match_id = %match_id, error = %e, "[ml-02] Persistence failed, queued for retry");
                        self.pending.lock().push(to_persist);
                        status
                    }
                }
            }
        };

        Ok(IngestReceipt {
            match_id,
            status,
            head,
        })
    }

    fn head_snapshot(&self) -> HeadSnapshot {
        self.store.snapshot()
    }
}
