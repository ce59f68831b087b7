//! Domain layer for the Peer Council.

pub mod buffer;
pub mod messages;
pub mod quorum;
pub mod selection;

pub use buffer::{EarlyBuffer, EarlyMessage};
pub use messages::{
    dispute_message, vouch_message, BeheadingClaim, DisputeNotice, Vouch, CLAIM_TOPIC,
    DISPUTE_TOPIC, VOUCH_TOPIC,
};
pub use quorum::{
    DisputeRecord, EpochQuorum, QuorumSnapshot, QuorumStatus, VouchOutcome, VouchRejection,
};
pub use selection::{council_seed, select_council, shuffle_with_seed};
