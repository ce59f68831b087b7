//! Ports for the Epoch Clock.

pub mod outbound;

pub use outbound::TimeSource;
