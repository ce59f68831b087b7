//! Read side of the morgue.

use crate::domain::MorgueCodec;
use crate::error::FinalizationResult;
use crate::ports::MorgueReader;
use shared_types::{ArchiveSummary, EpochId, MatchRecord};
use std::sync::Arc;
use tracing::debug;

/// Default and maximum page size for history listings.
pub const DEFAULT_MAX_PAGE_SIZE: usize = 100;

/// Archive history and on-demand body restore.
pub struct MorgueQueryService<R: MorgueReader> {
    reader: Arc<R>,
    codec: MorgueCodec,
    max_page_size: usize,
}

impl<R: MorgueReader> MorgueQueryService<R> {
    pub fn new(reader: Arc<R>, codec: MorgueCodec, max_page_size: usize) -> Self {
        Self {
            reader,
            codec,
            max_page_size: max_page_size.max(1),
        }
    }

    pub fn max_page_size(&self) -> usize {
        self.max_page_size
    }

    /// Newest first. `limit` is clamped to the page size cap.
    pub async fn history(&self, limit: usize) -> FinalizationResult<Vec<ArchiveSummary>> {
        let limit = limit.min(self.max_page_size);
        if limit == 0 {
            return Ok(Vec::new());
        }
        let archives = self.reader.list_archives(limit).await?;
        Ok(archives.iter().take(limit).map(|a| a.summary()).collect())
    }

    /// Full match list of a finalized epoch, or `None` if it was never archived.
    pub async fn archived_matches(
        &self,
        epoch_id: &EpochId,
    ) -> FinalizationResult<Option<Vec<MatchRecord>>> {
        let Some(archive) = self.reader.archive_by_epoch(epoch_id).await? else {
            return Ok(None);
        };
        let matches = self.codec.decode(&archive.record.compressed_body)?;
        debug!(epoch = %epoch_id, matches = matches.len(), "[ml-04] Restored archived body");
        Ok(Some(matches))
    }
}
