//! Driven Ports (SPI - Outbound Dependencies)

use async_trait::async_trait;
use shared_types::{ArchiveRecord, EpochId, MorgueId, SinkError, StoredArchive};

/// Archive insertion into the durable sink.
#[async_trait]
pub trait MorgueWriter: Send + Sync {
    /// Insert a finalized epoch and return the generated archive id.
    async fn insert_archive(&self, record: ArchiveRecord) -> Result<MorgueId, SinkError>;
}

/// Archive queries against the durable sink.
#[async_trait]
pub trait MorgueReader: Send + Sync {
    async fn archive_by_epoch(&self, epoch_id: &EpochId) -> Result<Option<StoredArchive>, SinkError>;

    /// Most recent archives first, at most `limit`.
    async fn list_archives(&self, limit: usize) -> Result<Vec<StoredArchive>, SinkError>;
}
