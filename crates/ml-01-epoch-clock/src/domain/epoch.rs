//! Epoch window arithmetic.
//!
//! An epoch is the UTC calendar day `[00:00:00Z, +24h)`. Unix time has no
//! leap seconds, so every epoch is exactly `EPOCH_LENGTH_MS` long.

use crate::error::{ClockError, ClockResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared_types::{EpochId, Timestamp};
use std::time::Duration;

/// Length of one epoch in milliseconds.
pub const EPOCH_LENGTH_MS: u64 = 24 * 60 * 60 * 1000;

/// Reference finalization window: the last five minutes of the day.
pub const DEFAULT_FINALIZATION_WINDOW: Duration = Duration::from_secs(5 * 60);

/// Where a point in time sits within its epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochInfo {
    pub epoch_id: EpochId,
    /// Inclusive start (ms since Unix epoch).
    pub epoch_start: Timestamp,
    /// Exclusive end (ms since Unix epoch).
    pub epoch_end: Timestamp,
    pub ms_remaining: u64,
    /// `ms_remaining <= window`.
    pub is_finalization_window: bool,
}

/// Pure epoch computation for a timestamp.
pub fn epoch_info_at(now_ms: Timestamp, window: Duration) -> ClockResult<EpochInfo> {
    let signed = i64::try_from(now_ms).map_err(|_| ClockError::OutOfRange {
        timestamp_ms: now_ms,
    })?;
    let date = DateTime::<Utc>::from_timestamp_millis(signed)
        .ok_or(ClockError::OutOfRange {
            timestamp_ms: now_ms,
        })?
        .date_naive();

    let epoch_start = now_ms - now_ms % EPOCH_LENGTH_MS;
    let epoch_end = epoch_start + EPOCH_LENGTH_MS;
    let ms_remaining = epoch_end - now_ms;
    let window_ms = u64::try_from(window.as_millis()).unwrap_or(u64::MAX);

    Ok(EpochInfo {
        epoch_id: EpochId::from_date(date),
        epoch_start,
        epoch_end,
        ms_remaining,
        is_finalization_window: ms_remaining <= window_ms,
    })
}
