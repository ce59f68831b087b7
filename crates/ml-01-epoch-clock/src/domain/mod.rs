//! Domain layer for the Epoch Clock.

pub mod epoch;

pub use epoch::{epoch_info_at, EpochInfo, DEFAULT_FINALIZATION_WINDOW, EPOCH_LENGTH_MS};
