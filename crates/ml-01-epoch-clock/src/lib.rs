//! # ml-01-epoch-clock
//!
//! Epoch Clock: maps wall-clock time to the ledger's epoch.
//!
//! ```text
//! 2025-01-01T00:00Z                                   2025-01-02T00:00Z
//!   |-------------------- epoch 2025-01-01 ---------------|
//!                                          |<- window W ->|
//!                                        is_finalization_window
//! ```
//!
//! The only failure is an unreadable clock, which callers treat as fatal.

pub mod adapters;
pub mod domain;
pub mod error;
pub mod ports;
pub mod service;

pub use adapters::{ManualTimeSource, SystemTimeSource};
pub use domain::{epoch_info_at, EpochInfo, DEFAULT_FINALIZATION_WINDOW, EPOCH_LENGTH_MS};
pub use error::{ClockError, ClockResult};
pub use ports::TimeSource;
pub use service::EpochClock;
