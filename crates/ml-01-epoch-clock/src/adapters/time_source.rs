use crate::error::{ClockError, ClockResult};
use crate::ports::TimeSource;
use chrono::{DateTime, Utc};
use shared_types::Timestamp;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

/// Reads `SystemTime::now()`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now_ms(&self) -> ClockResult<Timestamp> {
        let elapsed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| {
                warn!(error = %e, "[ml-01] System clock is before the Unix epoch");
                ClockError::Unavailable {
                    reason: e.to_string(),
                }
            })?;
        u64::try_from(elapsed.as_millis()).map_err(|_| ClockError::Unavailable {
            reason: "system time overflows u64 milliseconds".to_string(),
        })
    }
}

/// Manually driven clock for tests and simulations.
#[derive(Debug, Default)]
pub struct ManualTimeSource {
    now_ms: AtomicU64,
}

impl ManualTimeSource {
    pub fn new(now_ms: Timestamp) -> Self {
        Self {
            now_ms: AtomicU64::new(now_ms),
        }
    }

    /// Start at a UTC instant. Instants before 1970 clamp to zero.
    pub fn at(instant: DateTime<Utc>) -> Self {
        Self::new(u64::try_from(instant.timestamp_millis()).unwrap_or(0))
    }

    pub fn set(&self, now_ms: Timestamp) {
        let before = self.now_ms.swap(now_ms, Ordering::SeqCst);
        if now_ms < before {
            debug!(before, now_ms, "[ml-01] Manual clock moved backwards");
        }
    }

    pub fn advance(&self, by: Duration) {
        let delta = u64::try_from(by.as_millis()).unwrap_or(u64::MAX);
        let _ = self
            .now_ms
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |now| {
                Some(now.saturating_add(delta))
            });
    }

    pub fn get(&self) -> Timestamp {
        self.now_ms.load(Ordering::SeqCst)
    }
}

impl TimeSource for ManualTimeSource {
    fn now_ms(&self) -> ClockResult<Timestamp> {
        Ok(self.get())
    }
}
