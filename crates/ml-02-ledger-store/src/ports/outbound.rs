//! Driven Ports (SPI - Outbound Dependencies)

use async_trait::async_trait;
use shared_types::{Hash, MatchRecord, SinkError};

/// Durable store for live match records.
///
/// Production: `KvLedgerSink` (node-runtime/adapters/storage)
/// Testing: `InMemoryLedgerSink`
#[async_trait]
pub trait MatchSink: Send + Sync {
    /// Idempotent upsert keyed by `match_id`; safe to retry.
    async fn upsert_match(&self, record: &MatchRecord) -> Result<(), SinkError>;

    /// Head hash of the most recently archived epoch, if any.
    async fn latest_archived_head_hash(&self) -> Result<Option<Hash>, SinkError>;
}
