//! Multi-peer integration scenarios.

pub mod council;
pub mod divergence;
pub mod genesis;
pub mod rollover;
pub mod startup_sync;
