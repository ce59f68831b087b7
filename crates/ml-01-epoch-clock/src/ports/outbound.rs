//! Driven Ports (SPI - Outbound Dependencies)

use crate::error::ClockResult;
use shared_types::Timestamp;

/// Wall-clock source.
///
/// Production reads the system clock; tests drive a manual clock so
/// rollover can be forced deterministically.
pub trait TimeSource: Send + Sync {
    /// Current time in milliseconds since the Unix epoch (UTC).
    fn now_ms(&self) -> ClockResult<Timestamp>;
}
