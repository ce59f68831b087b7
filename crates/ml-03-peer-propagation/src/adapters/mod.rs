//! Adapters binding propagation to the ledger store and the transport.

mod ledger;
mod transport;

pub use transport::{HeadUpdateHandler, SyncRequestHandler};
