//! # Storage Adapters
//!
//! Key-value backends behind the ledger sink.
//!
//! - `InMemoryKVStore`: ordered map, used by tests and single-process runs
//! - `RocksDbStore`: production backend, enabled with the `rocksdb` feature
//!
//! ```toml
//! node-runtime = { path = "...", features = ["rocksdb"] }
//! ```

#[cfg(feature = "rocksdb")]
pub mod rocksdb_adapter;

#[cfg(feature = "rocksdb")]
pub use rocksdb_adapter::{RocksDbConfig, RocksDbStore};

use shared_types::SinkError;
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors raised by a key-value backend.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum KvError {
    #[error("I/O error: {message}")]
    Io { message: String },

    #[error("Corruption: {message}")]
    Corruption { message: String },
}

impl From<KvError> for SinkError {
    fn from(err: KvError) -> Self {
        match err {
            KvError::Io { message } => SinkError::Unavailable(message),
            KvError::Corruption { message } => SinkError::Corrupt(message),
        }
    }
}

/// Abstract key-value store.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KvError>;

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), KvError>;

    /// Either every operation is applied or none is.
    fn atomic_batch_write(&mut self, operations: Vec<BatchOperation>) -> Result<(), KvError>;

    /// All pairs whose key starts with `prefix`, in ascending key order.
    fn prefix_scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, KvError>;
}

/// One write in an atomic batch. The ledger never deletes: live matches
/// are upserted and archives are only added or rewritten.
#[derive(Debug, Clone)]
pub enum BatchOperation {
    Put { key: Vec<u8>, value: Vec<u8> },
}

impl BatchOperation {
    pub fn put(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        BatchOperation::Put {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// In-memory store over an ordered map.
#[derive(Debug, Default)]
pub struct InMemoryKVStore {
    data: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl InMemoryKVStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl KeyValueStore for InMemoryKVStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KvError> {
        Ok(self.data.get(key).cloned())
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), KvError> {
        self.data.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn atomic_batch_write(&mut self, operations: Vec<BatchOperation>) -> Result<(), KvError> {
        for op in operations {
            let BatchOperation::Put { key, value } = op;
            self.data.insert(key, value);
        }
        Ok(())
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, KvError> {
        Ok(self
            .data
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}
