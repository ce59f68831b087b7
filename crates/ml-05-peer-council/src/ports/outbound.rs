//! Driven Ports (SPI - Outbound Dependencies)

use async_trait::async_trait;
use shared_types::{ArchiveAuthentication, EpochId, PeerId, SinkError, StoredArchive};

/// Signs council messages with the local member's key.
pub trait ChecksumSigner: Send + Sync {
    /// Council identity of the local peer.
    fn member(&self) -> PeerId;

    fn sign(&self, message: &[u8]) -> Vec<u8>;
}

/// Verifies another member's signature. Peer ids are public keys.
pub trait VouchVerifier: Send + Sync {
    fn verify(&self, member: &PeerId, message: &[u8], signature: &[u8]) -> bool;
}

/// Archive access needed for independent verification.
#[async_trait]
pub trait CouncilArchive: Send + Sync {
    async fn archive_by_epoch(&self, epoch_id: &EpochId)
        -> Result<Option<StoredArchive>, SinkError>;

    /// Record the quorum's signatures against the archive.
    async fn mark_authenticated(
        &self,
        epoch_id: &EpochId,
        authentication: ArchiveAuthentication,
    ) -> Result<(), SinkError>;
}
