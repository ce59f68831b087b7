//! Domain layer for Peer Propagation.

pub mod divergence;
pub mod messages;
pub mod pending;

pub use divergence::{compare_heads, DivergenceLog, DivergenceRecord, HeadComparison};
pub use messages::{HeadUpdate, SyncRequest, HEAD_UPDATE_TOPIC, SYNC_REQUEST_TOPIC};
pub use pending::PendingSyncs;
