//! Epoch Clock service

use crate::adapters::SystemTimeSource;
use crate::domain::{epoch_info_at, EpochInfo, DEFAULT_FINALIZATION_WINDOW};
use crate::error::ClockResult;
use crate::ports::TimeSource;
use shared_types::{EpochId, Timestamp};
use std::sync::Arc;
use std::time::Duration;

/// Answers "which epoch is it, and how long until it ends".
///
/// Stateless apart from its time source; callable at any frequency.
#[derive(Clone)]
pub struct EpochClock {
    source: Arc<dyn TimeSource>,
    finalization_window: Duration,
}

impl EpochClock {
    pub fn new(source: Arc<dyn TimeSource>, finalization_window: Duration) -> Self {
        Self {
            source,
            finalization_window,
        }
    }

    /// System clock with the reference five-minute window.
    pub fn system() -> Self {
        Self::new(Arc::new(SystemTimeSource), DEFAULT_FINALIZATION_WINDOW)
    }

    pub fn finalization_window(&self) -> Duration {
        self.finalization_window
    }

    pub fn now_ms(&self) -> ClockResult<Timestamp> {
        self.source.now_ms()
    }

    /// Epoch info for the current time.
    pub fn now(&self) -> ClockResult<EpochInfo> {
        self.at(self.source.now_ms()?)
    }

    /// Epoch info for an arbitrary time.
    pub fn at(&self, timestamp_ms: Timestamp) -> ClockResult<EpochInfo> {
        epoch_info_at(timestamp_ms, self.finalization_window)
    }

    pub fn current_epoch(&self) -> ClockResult<EpochId> {
        Ok(self.now()?.epoch_id)
    }
}

impl std::fmt::Debug for EpochClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EpochClock")
            .field("finalization_window", &self.finalization_window)
            .finish()
    }
}
