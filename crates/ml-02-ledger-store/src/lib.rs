//! # ml-02-ledger-store
//!
//! Ledger Store and Match Ingestion.
//!
//! Holds the one live `Head`/`Body` pair of the current epoch and is the
//! single mutation point for it:
//!
//! ```text
//! game ──MatchRecord──→ IngestionService ──append──→ LedgerStore (mutex)
//!                           │        │
//!                           │        └──HeadUpdated──→ shared bus ──→ propagation
//!                           └──upsert (retry/backoff)──→ durable sink
//! ```
//!
//! ## Head hash
//!
//! `headHash` is recomputed from `(epochId, previousHeadHash, matchCount,
//! matchHashes, totalPlayers, totalTimePlayed)` on every change. With no
//! matches it depends on `epochId` alone, so fresh peers agree on genesis.
//!
//! ## Rollover guard
//!
//! `begin_rollover` freezes the outgoing epoch; until `commit_rollover` or
//! `abort_rollover`, new matches wait in a bounded buffer.

pub mod domain;
pub mod error;
pub mod ports;
pub mod service;

pub use domain::{
    body_checksum, compute_head_hash, genesis_hash, AppendOutcome, Body, FrozenEpoch, Head,
    LedgerStore, RetryPolicy, RolloverOutcome, DEFAULT_DEFERRED_CAPACITY,
};
pub use error::{LedgerError, LedgerResult};
pub use ports::{Durability, IngestReceipt, IngestStatus, IngestionApi, MatchSink};
pub use service::{persist_with_retry, FlushReport, IngestionConfig, IngestionService};
