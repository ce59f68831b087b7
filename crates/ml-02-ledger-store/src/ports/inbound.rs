//! Driving Ports (API - Inbound)

use crate::error::LedgerResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shared_types::{HeadSnapshot, MatchId, MatchRecord};

/// How long `record_match` waits on the durable sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Durability {
    /// Return once the local ledger is updated; persist in the background.
    #[default]
    Local,
    /// Return after the sink write settles (or its retries run out).
    Persisted,
}

/// Where an ingested match ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IngestStatus {
    /// In the live Head/Body; sink write pending or in the background.
    IngestedLocally,
    /// In the live Head/Body and confirmed by the sink.
    IngestedAndPersisted,
    /// Parked until the in-flight rollover finishes.
    Deferred,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReceipt {
    pub match_id: MatchId,
    pub status: IngestStatus,
    /// Head right after the append, when applied immediately.
    pub head: Option<HeadSnapshot>,
}

/// Match ingestion API.
#[async_trait]
pub trait IngestionApi: Send + Sync {
    /// Append a completed match to the current epoch.
    async fn record_match(
        &self,
        record: MatchRecord,
        durability: Durability,
    ) -> LedgerResult<IngestReceipt>;

    /// Current Head as a snapshot.
    fn head_snapshot(&self) -> HeadSnapshot;
}
