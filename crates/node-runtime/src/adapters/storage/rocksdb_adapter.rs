//! # RocksDB Storage Adapter
//!
//! Durable `KeyValueStore` for `KvLedgerSink`. Live matches, archive
//! metadata and archive bodies share one column family; the sink's key
//! prefixes keep them apart and `prefix_scan` walks one prefix at a time.
//!
//! An archive's metadata and body go in one `WriteBatch`, so a crash
//! mid-finalization never leaves metadata without its body.

use super::{BatchOperation, KeyValueStore, KvError};
use rocksdb::{BlockBasedOptions, Cache, DBCompressionType, Direction, IteratorMode, Options};
use rocksdb::{WriteBatch, WriteOptions, DB};
use std::path::{Path, PathBuf};
use tracing::info;

/// Tuning for the ledger database.
#[derive(Debug, Clone)]
pub struct RocksDbConfig {
    pub path: PathBuf,
    /// LRU block cache shared by all lookups.
    pub block_cache_bytes: usize,
    pub write_buffer_bytes: usize,
    /// fsync every write. Off only in tests.
    pub sync_writes: bool,
}

impl RocksDbConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            block_cache_bytes: 32 << 20,
            write_buffer_bytes: 8 << 20,
            sync_writes: true,
        }
    }

    #[must_use]
    pub fn without_sync(mut self) -> Self {
        self.sync_writes = false;
        self
    }
}

fn io(op: &'static str) -> impl FnOnce(rocksdb::Error) -> KvError {
    move |e| KvError::Io {
        message: format!("rocksdb {op}: {e}"),
    }
}

/// RocksDB-backed store.
pub struct RocksDbStore {
    db: DB,
    write_opts: WriteOptions,
}

impl RocksDbStore {
    pub fn open(config: RocksDbConfig) -> Result<Self, KvError> {
        let mut table = BlockBasedOptions::default();
        // Point lookups by match id dominate reads.
        table.set_bloom_filter(10.0, false);
        table.set_block_cache(&Cache::new_lru_cache(config.block_cache_bytes));

        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.set_write_buffer_size(config.write_buffer_bytes);
        opts.set_compression_type(DBCompressionType::Snappy);
        opts.set_block_based_table_factory(&table);

        let db = DB::open(&opts, &config.path).map_err(io("open"))?;

        let mut write_opts = WriteOptions::default();
        write_opts.set_sync(config.sync_writes);

        info!(path = %config.path.display(), sync = config.sync_writes, "RocksDB ledger store opened");
        Ok(Self { db, write_opts })
    }

    /// Open with default tuning and fsync on.
    pub fn open_default(path: impl AsRef<Path>) -> Result<Self, KvError> {
        Self::open(RocksDbConfig::new(path.as_ref()))
    }
}

impl KeyValueStore for RocksDbStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KvError> {
        self.db.get(key).map_err(io("get"))
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), KvError> {
        self.db.put_opt(key, value, &self.write_opts).map_err(io("put"))
    }

    fn atomic_batch_write(&mut self, operations: Vec<BatchOperation>) -> Result<(), KvError> {
        let batch = operations
            .into_iter()
            .fold(WriteBatch::default(), |mut batch, op| {
                let BatchOperation::Put { key, value } = op;
                batch.put(key, value);
                batch
            });
        self.db.write_opt(batch, &self.write_opts).map_err(io("batch"))
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, KvError> {
        self.db
            .iterator(IteratorMode::From(prefix, Direction::Forward))
            .map(|item| item.map_err(io("scan")))
            .take_while(|item| match item {
                Ok((key, _)) => key.starts_with(prefix),
                Err(_) => true,
            })
            .map(|item| item.map(|(key, value)| (key.into_vec(), value.into_vec())))
            .collect()
    }
}
