//! # Ledger Sink
//!
//! Durable sink over any `KeyValueStore`: live match upserts, the morgue and
//! quorum authentication marks.
//!
//! ## Key layout
//!
//! | Key | Value |
//! |-----|-------|
//! | `match/{match_id}` | bincode `MatchRecord` |
//! | `archive-meta/{epoch_id}` | JSON `StoredArchive` with an empty body |
//! | `archive-body/{epoch_id}` | compressed body bytes |
//!
//! Epoch ids are `YYYY-MM-DD`, so ascending key order is chronological.

use super::storage::{BatchOperation, InMemoryKVStore, KeyValueStore};
use async_trait::async_trait;
use ml_02_ledger_store::MatchSink;
use ml_04_beheading::{MorgueReader, MorgueWriter};
use ml_05_peer_council::CouncilArchive;
use parking_lot::RwLock;
use shared_types::{
    short_hash, ArchiveAuthentication, ArchiveRecord, EpochId, Hash, MatchRecord, MorgueId,
    SinkError, StoredArchive,
};
use tracing::{debug, warn};
use uuid::Uuid;

const MATCH_PREFIX: &str = "match/";
const ARCHIVE_META_PREFIX: &str = "archive-meta/";
const ARCHIVE_BODY_PREFIX: &str = "archive-body/";

fn match_key(match_id: &str) -> Vec<u8> {
    format!("{MATCH_PREFIX}{match_id}").into_bytes()
}

fn meta_key(epoch_id: &EpochId) -> Vec<u8> {
    format!("{ARCHIVE_META_PREFIX}{epoch_id}").into_bytes()
}

fn body_key(epoch_id: &EpochId) -> Vec<u8> {
    format!("{ARCHIVE_BODY_PREFIX}{epoch_id}").into_bytes()
}

/// Sink over the in-memory backend.
pub type InMemoryLedgerSink = KvLedgerSink<InMemoryKVStore>;

/// Durable sink backed by a key-value store.
pub struct KvLedgerSink<K: KeyValueStore> {
    store: RwLock<K>,
}

impl InMemoryLedgerSink {
    pub fn in_memory() -> Self {
        Self::new(InMemoryKVStore::new())
    }
}

impl<K: KeyValueStore> KvLedgerSink<K> {
    pub fn new(store: K) -> Self {
        Self {
            store: RwLock::new(store),
        }
    }

    /// Live record previously upserted under `match_id`.
    pub fn live_match(&self, match_id: &str) -> Result<Option<MatchRecord>, SinkError> {
        let raw = self.store.read().get(&match_key(match_id))?;
        raw.map(|bytes| {
            bincode::deserialize(&bytes).map_err(|e| SinkError::Corrupt(e.to_string()))
        })
        .transpose()
    }

    pub fn live_match_count(&self) -> Result<usize, SinkError> {
        Ok(self.store.read().prefix_scan(MATCH_PREFIX.as_bytes())?.len())
    }

    fn load_meta(&self, epoch_id: &EpochId) -> Result<Option<StoredArchive>, SinkError> {
        let raw = self.store.read().get(&meta_key(epoch_id))?;
        raw.map(|bytes| decode_meta(&bytes)).transpose()
    }

    fn load_archive(&self, epoch_id: &EpochId) -> Result<Option<StoredArchive>, SinkError> {
        let store = self.store.read();
        let Some(meta) = store.get(&meta_key(epoch_id))? else {
            return Ok(None);
        };
        let mut archive = decode_meta(&meta)?;
        archive.record.compressed_body = store
            .get(&body_key(epoch_id))?
            .ok_or_else(|| SinkError::Corrupt(format!("archive {epoch_id} has no body")))?;
        Ok(Some(archive))
    }

    /// Archive metadata, oldest first.
    fn archived_epochs(&self) -> Result<Vec<StoredArchive>, SinkError> {
        self.store
            .read()
            .prefix_scan(ARCHIVE_META_PREFIX.as_bytes())?
            .iter()
            .map(|(_, value)| decode_meta(value))
            .collect()
    }

    fn put_meta(&self, archive: &StoredArchive) -> Result<(), SinkError> {
        let meta = encode_meta(archive)?;
        self.store
            .write()
            .put(&meta_key(&archive.record.epoch_id), &meta)?;
        Ok(())
    }
}

/// Metadata is stored without the body, which lives under its own key.
fn encode_meta(archive: &StoredArchive) -> Result<Vec<u8>, SinkError> {
    let mut meta = archive.clone();
    meta.record.compressed_body = Vec::new();
    serde_json::to_vec(&meta).map_err(|e| SinkError::Corrupt(e.to_string()))
}

fn decode_meta(bytes: &[u8]) -> Result<StoredArchive, SinkError> {
    serde_json::from_slice(bytes).map_err(|e| SinkError::Corrupt(e.to_string()))
}

#[async_trait]
impl<K: KeyValueStore + 'static> MatchSink for KvLedgerSink<K> {
    async fn upsert_match(&self, record: &MatchRecord) -> Result<(), SinkError> {
        let value = bincode::serialize(record).map_err(|e| SinkError::Corrupt(e.to_string()))?;
        self.store.write().put(&match_key(&record.match_id), &value)?;
        debug!(match_id = %record.match_id, "[node] Match upserted");
        Ok(())
    }

    async fn latest_archived_head_hash(&self) -> Result<Option<Hash>, SinkError> {
        let latest = self
            .store
            .read()
            .prefix_scan(ARCHIVE_META_PREFIX.as_bytes())?
            .pop();
        latest
            .map(|(_, value)| decode_meta(&value).map(|a| a.record.head_hash))
            .transpose()
    }
}

#[async_trait]
impl<K: KeyValueStore + 'static> MorgueWriter for KvLedgerSink<K> {
    async fn insert_archive(&self, record: ArchiveRecord) -> Result<MorgueId, SinkError> {
        let epoch_id = record.epoch_id;

        if let Some(existing) = self.load_meta(&epoch_id)? {
            if existing.record.head_hash == record.head_hash
                && existing.record.body_checksum == record.body_checksum
            {
                debug!(epoch = %epoch_id, "[node] Archive already present");
                return Ok(existing.morgue_id);
            }
            warn!(
                epoch = %epoch_id,
                old_head = %short_hash(&existing.record.head_hash),
                new_head = %short_hash(&record.head_hash),
                "[node] Replacing archive with a different head"
            );
        }

        let morgue_id = MorgueId::new(Uuid::new_v4().to_string());
        let body = record.compressed_body.clone();
        let archive = StoredArchive {
            morgue_id: morgue_id.clone(),
            record,
            authentication: None,
        };
        let meta = encode_meta(&archive)?;

        self.store.write().atomic_batch_write(vec![
            BatchOperation::put(meta_key(&epoch_id), meta),
            BatchOperation::put(body_key(&epoch_id), body),
        ])?;

        Ok(morgue_id)
    }
}

#[async_trait]
impl<K: KeyValueStore + 'static> MorgueReader for KvLedgerSink<K> {
    async fn archive_by_epoch(
        &self,
        epoch_id: &EpochId,
    ) -> Result<Option<StoredArchive>, SinkError> {
        self.load_archive(epoch_id)
    }

    async fn list_archives(&self, limit: usize) -> Result<Vec<StoredArchive>, SinkError> {
        let epochs = self.archived_epochs()?;
        let mut archives = Vec::with_capacity(limit.min(epochs.len()));
        for meta in epochs.iter().rev().take(limit) {
            if let Some(archive) = self.load_archive(&meta.record.epoch_id)? {
                archives.push(archive);
            }
        }
        Ok(archives)
    }
}

#[async_trait]
impl<K: KeyValueStore + 'static> CouncilArchive for KvLedgerSink<K> {
    async fn archive_by_epoch(
        &self,
        epoch_id: &EpochId,
    ) -> Result<Option<StoredArchive>, SinkError> {
        self.load_archive(epoch_id)
    }

    async fn mark_authenticated(
        &self,
        epoch_id: &EpochId,
        authentication: ArchiveAuthentication,
    ) -> Result<(), SinkError> {
        let mut archive = self
            .load_meta(epoch_id)?
            .ok_or_else(|| SinkError::NotFound(format!("archive {epoch_id}")))?;
        archive.authentication = Some(authentication);
        self.put_meta(&archive)
    }
}
