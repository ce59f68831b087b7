//! Ports for Beheading.

pub mod inbound;
pub mod outbound;

pub use inbound::BeheadingApi;
pub use outbound::{MorgueReader, MorgueWriter};
