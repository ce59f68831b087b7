//! Domain layer for the Ledger Store.

pub mod body;
pub mod head;
pub mod retry;
pub mod store;

pub use body::{body_checksum, Body};
pub use head::{compute_head_hash, genesis_hash, Head};
pub use retry::RetryPolicy;
pub use store::{
    AppendOutcome, FrozenEpoch, LedgerStore, RolloverOutcome, DEFAULT_DEFERRED_CAPACITY,
};
