//! Time source adapters.

mod time_source;

pub use time_source::{ManualTimeSource, SystemTimeSource};
