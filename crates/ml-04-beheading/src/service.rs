//! Beheading service
//!
//! Rollover of the live epoch, in order:
//!
//! 1. recompute the outgoing head hash
//! 2. compute the body checksum
//! 3. compress the body and insert the archive (captures `morgue_id`)
//! 4. build the provisional `BeheadingResult`
//! 5. open the new epoch chained to the finalized hash
//! 6. release the guard; deferred matches are replayed into the new epoch
//!
//! Any failure in 1-4 aborts: the old epoch stays live and the next clock
//! tick retries. The clock is read once, before the guard is taken.

use crate::domain::MorgueCodec;
use crate::error::{BeheadingError, FinalizationResult};
use crate::ports::{BeheadingApi, MorgueWriter};
use async_trait::async_trait;
use ml_01_epoch_clock::EpochClock;
use ml_02_ledger_store::{body_checksum, FrozenEpoch, LedgerError, LedgerStore, RolloverOutcome};
use shared_bus::{EventPublisher, LedgerEvent};
use shared_types::{short_hash, ArchiveRecord, BeheadingResult, EpochId, Timestamp};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Finalizes epochs of one `LedgerStore`.
pub struct BeheadingService<W: MorgueWriter> {
    store: Arc<LedgerStore>,
    writer: Arc<W>,
    clock: EpochClock,
    bus: Arc<dyn EventPublisher>,
    codec: MorgueCodec,
}

impl<W: MorgueWriter> BeheadingService<W> {
    pub fn new(
        store: Arc<LedgerStore>,
        writer: Arc<W>,
        clock: EpochClock,
        bus: Arc<dyn EventPublisher>,
        codec: MorgueCodec,
    ) -> Self {
        Self {
            store,
            writer,
            clock,
            bus,
            codec,
        }
    }

    pub fn codec(&self) -> &MorgueCodec {
        &self.codec
    }

    /// Steps 1-4.
    async fn behead(
        &self,
        frozen: &FrozenEpoch,
        finalized_at: Timestamp,
    ) -> FinalizationResult<BeheadingResult> {
        let epoch_id = frozen.head.epoch_id;

        let head_hash = frozen.head.compute_hash();
        if head_hash != frozen.head.head_hash {
            warn!(epoch = %epoch_id, "[ml-04] Stored head hash was stale, using recomputed value");
        }
        info!(epoch = %epoch_id, head = %short_hash(&head_hash), "[ml-04] Step 1: final head hash");

        let checksum = body_checksum(&frozen.body.matches)?;
        info!(
            epoch = %epoch_id,
            matches = frozen.body.len(),
            checksum = %short_hash(&checksum),
            "[ml-04] Step 2: body checksum"
        );

        let encoded = self.codec.encode(&frozen.body.matches)?;
        let record = ArchiveRecord {
            epoch_id,
            head_hash,
            previous_head_hash: frozen.head.previous_head_hash,
            body_checksum: checksum,
            match_count: frozen.head.match_count,
            total_players: frozen.head.total_players,
            total_time_played: frozen.head.total_time_played,
            body_size: encoded.raw_size,
            compressed_body: encoded.bytes,
            epoch_created_at: frozen.head.created_at,
            finalized_at,
        };
        let compressed = record.compressed_body.len();
        let morgue_id = self.writer.insert_archive(record).await?;
        info!(
            epoch = %epoch_id,
            morgue_id = %morgue_id,
            raw_bytes = encoded.raw_size,
            compressed_bytes = compressed,
            "[ml-04] Step 3: archived to morgue"
        );

        let result = BeheadingResult {
            epoch_id,
            head_hash,
            previous_head_hash: frozen.head.previous_head_hash,
            body_checksum: checksum,
            match_count: frozen.head.match_count,
            morgue_id,
            authenticated_by: Vec::new(),
            signatures: BTreeMap::new(),
            finalized_at,
        };
        info!(epoch = %epoch_id, "[ml-04] Step 4: beheading result built");
        Ok(result)
    }

    async fn publish_replayed(&self, outcome: &RolloverOutcome) {
        for head in &outcome.replayed {
            self.bus.publish(LedgerEvent::HeadUpdated(head.clone())).await;
        }
    }

    async fn abort(&self, epoch_id: EpochId, err: &BeheadingError, now: Timestamp) {
        error!(epoch = %epoch_id, error = %err, "[ml-04] Finalization failed, old epoch stays live");
        match self.store.abort_rollover(now) {
            Ok(outcome) => self.publish_replayed(&outcome).await,
            Err(e) => error!(epoch = %epoch_id, error = %e, "[ml-04] Rollover abort failed"),
        }
        self.bus
            .publish(LedgerEvent::FinalizationFailed {
                epoch_id,
                reason: err.to_string(),
            })
            .await;
    }
}

#[async_trait]
impl<W: MorgueWriter> BeheadingApi for BeheadingService<W> {
    async fn finalize(&self, next_epoch: EpochId) -> FinalizationResult<BeheadingResult> {
        let now = self.clock.now_ms()?;
        // Rejected here when another rollover holds the guard.
        let frozen = self.store.begin_rollover(next_epoch)?;
        let epoch_id = frozen.head.epoch_id;

        info!(
            epoch = %epoch_id,
            next = %next_epoch,
            matches = frozen.head.match_count,
            "[ml-04] Beheading started"
        );
        self.bus
            .publish(LedgerEvent::FinalizationStarted { epoch_id })
            .await;

        let result = match self.behead(&frozen, now).await {
            Ok(result) => result,
            Err(e) => {
                self.abort(epoch_id, &e, now).await;
                return Err(e);
            }
        };

        let outcome = self
            .store
            .commit_rollover(next_epoch, result.head_hash, now)?;
        info!(
            epoch = %next_epoch,
            previous = %short_hash(&result.head_hash),
            replayed = outcome.replayed.len(),
            "[ml-04] Step 5-6: new epoch live"
        );

        self.publish_replayed(&outcome).await;
        self.bus
            .publish(LedgerEvent::FinalizationComplete(result.clone()))
            .await;
        Ok(result)
    }

    async fn check_rollover(&self) -> FinalizationResult<Option<BeheadingResult>> {
        let info = self.clock.now()?;
        let live = self.store.epoch_id();
        if info.epoch_id <= live {
            return Ok(None);
        }
        if self.store.is_closing() {
            debug!(epoch = %live, "[ml-04] Rollover already in flight");
            return Ok(None);
        }
        match self.finalize(info.epoch_id).await {
            Ok(result) => Ok(Some(result)),
            // Lost the race against a concurrent tick; not an error.
            Err(BeheadingError::Ledger(LedgerError::FinalizationInProgress { .. })) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
