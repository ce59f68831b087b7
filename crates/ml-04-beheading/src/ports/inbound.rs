//! Driving Ports (API - Inbound)

use crate::error::FinalizationResult;
use async_trait::async_trait;
use shared_types::{BeheadingResult, EpochId};

/// Finalization API.
#[async_trait]
pub trait BeheadingApi: Send + Sync {
    /// Finalize the live epoch and open `next_epoch`.
    async fn finalize(&self, next_epoch: EpochId) -> FinalizationResult<BeheadingResult>;

    /// Finalize if the clock has moved past the live epoch. Called every tick.
    async fn check_rollover(&self) -> FinalizationResult<Option<BeheadingResult>>;
}
