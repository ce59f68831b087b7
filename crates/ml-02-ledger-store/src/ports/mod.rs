//! Ports for the Ledger Store.

pub mod inbound;
pub mod outbound;

pub use inbound::{Durability, IngestReceipt, IngestStatus, IngestionApi};
pub use outbound::MatchSink;
