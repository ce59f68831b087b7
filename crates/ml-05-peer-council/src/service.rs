//! Peer Council service
//!
//! Drives one `EpochQuorum` per locally finalized epoch:
//!
//! 1. derive the council from the epoch's chain link and the peer set
//! 2. broadcast the claim
//! 3. recompute the checksum from the archived body
//! 4. vouch (match) or dispute (mismatch), if a council member
//! 5. collect vouches until the threshold, then mark the archive
//!
//! Messages for epochs not yet finalized locally are held in a bounded
//! buffer and replayed after step 2.

use crate::adapters::{ClaimHandler, DisputeHandler, VouchHandler};
use crate::domain::messages::encode;
use crate::domain::{
    select_council, BeheadingClaim, DisputeNotice, DisputeRecord, EarlyBuffer, EarlyMessage,
    EpochQuorum, QuorumSnapshot, QuorumStatus, Vouch, VouchOutcome, VouchRejection, CLAIM_TOPIC,
    DISPUTE_TOPIC, VOUCH_TOPIC,
};
use crate::domain::{dispute_message, vouch_message};
use crate::error::{CouncilError, CouncilResult};
use crate::ports::{ChecksumSigner, CouncilApi, CouncilArchive, VouchVerifier};
use async_trait::async_trait;
use ml_01_epoch_clock::EpochClock;
use ml_02_ledger_store::body_checksum;
use ml_04_beheading::MorgueCodec;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use shared_bus::{EventPublisher, LedgerEvent};
use shared_types::{
    short_hash, ArchiveAuthentication, BeheadingResult, EpochId, Hash, PeerId, PeerTransport,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Council configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CouncilConfig {
    /// Members drawn per epoch.
    pub council_size: usize,
    /// Vouches needed for hard-finality.
    pub quorum_threshold: usize,
    /// Early messages held for epochs not yet finalized locally.
    pub deferred_capacity: usize,
    /// Quorums kept for status queries.
    pub retained_epochs: usize,
}

impl Default for CouncilConfig {
    fn default() -> Self {
        Self {
            council_size: 5,
            quorum_threshold: 3,
            deferred_capacity: 256,
            retained_epochs: 30,
        }
    }
}

/// What to do about a claim, decided under the lock.
enum ClaimAction {
    Buffer,
    Reply(Vouch),
    Dispute { ours: Hash },
    Ignore,
}

/// Quorum authentication for the local peer.
pub struct CouncilService<A: CouncilArchive + 'static> {
    transport: Arc<dyn PeerTransport>,
    archive: Arc<A>,
    signer: Arc<dyn ChecksumSigner>,
    verifier: Arc<dyn VouchVerifier>,
    bus: Arc<dyn EventPublisher>,
    clock: EpochClock,
    codec: MorgueCodec,
    config: CouncilConfig,
    quorums: Mutex<BTreeMap<EpochId, EpochQuorum>>,
    early: Mutex<EarlyBuffer>,
}

impl<A: CouncilArchive + 'static> CouncilService<A> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        transport: Arc<dyn PeerTransport>,
        archive: Arc<A>,
        signer: Arc<dyn ChecksumSigner>,
        verifier: Arc<dyn VouchVerifier>,
        bus: Arc<dyn EventPublisher>,
        clock: EpochClock,
        codec: MorgueCodec,
        config: CouncilConfig,
    ) -> Self {
        let early = Mutex::new(EarlyBuffer::new(config.deferred_capacity));
        Self {
            transport,
            archive,
            signer,
            verifier,
            bus,
            clock,
            codec,
            config,
            quorums: Mutex::new(BTreeMap::new()),
            early,
        }
    }

    /// Attach the claim, vouch and dispute handlers to the transport.
    pub fn register_handlers(self: &Arc<Self>) {
        self.transport
            .register_handler(CLAIM_TOPIC, Arc::new(ClaimHandler::new(Arc::downgrade(self))));
        self.transport
            .register_handler(VOUCH_TOPIC, Arc::new(VouchHandler::new(Arc::downgrade(self))));
        self.transport.register_handler(
            DISPUTE_TOPIC,
            Arc::new(DisputeHandler::new(Arc::downgrade(self))),
        );
    }

    pub fn config(&self) -> &CouncilConfig {
        &self.config
    }

    /// Every tracked quorum, oldest epoch first.
    pub fn quorums(&self) -> Vec<QuorumSnapshot> {
        self.quorums.lock().values().map(EpochQuorum::snapshot).collect()
    }

    pub fn early_messages(&self) -> usize {
        self.early.lock().len()
    }

    fn defer(&self, message: EarlyMessage) {
        let epoch_id = message.epoch_id();
        if let Some(evicted) = self.early.lock().push(message) {
            warn!(
                epoch = %epoch_id,
                evicted_epoch = %evicted.epoch_id(),
                "[ml-05] Early message buffer full, dropped oldest"
            );
        }
    }

    /// Checksum recomputed from the archived body, or `None` if not archived yet.
    async fn observed_checksum(&self, epoch_id: &EpochId) -> CouncilResult<Option<Hash>> {
        let Some(archive) = self.archive.archive_by_epoch(epoch_id).await? else {
            return Ok(None);
        };
        let matches = self.codec.decode(&archive.record.compressed_body)?;
        Ok(Some(body_checksum(&matches)?))
    }

    async fn verify_and_vouch(&self, epoch_id: EpochId) -> CouncilResult<QuorumStatus> {
        let claimed = {
            let mut quorums = self.quorums.lock();
            let quorum = quorums
                .get_mut(&epoch_id)
                .ok_or(CouncilError::UnknownEpoch { epoch_id })?;
            if !quorum.needs_verification() {
                return Ok(quorum.status());
            }
            quorum.begin_verification();
            quorum.body_checksum()
        };

        let Some(observed) = self.observed_checksum(&epoch_id).await? else {
            debug!(epoch = %epoch_id, "[ml-05] Archive not visible yet, verification deferred");
            return Ok(QuorumStatus::Verifying);
        };

        if observed == claimed {
            self.vouch(epoch_id, claimed).await
        } else {
            self.dispute_own(epoch_id, claimed, observed).await
        }
    }

    async fn vouch(&self, epoch_id: EpochId, checksum: Hash) -> CouncilResult<QuorumStatus> {
        let member = self.signer.member();
        let vouch = Vouch {
            epoch_id,
            body_checksum: checksum,
            member,
            signature: self.signer.sign(&vouch_message(&epoch_id, &checksum)),
        };

        let (outcome, status) = {
            let mut quorums = self.quorums.lock();
            let quorum = quorums
                .get_mut(&epoch_id)
                .ok_or(CouncilError::UnknownEpoch { epoch_id })?;
            quorum.verification_passed();
            let outcome = if quorum.is_member(&member) {
                quorum.set_local_vouch(vouch.clone());
                Some(quorum.add_vouch(member, checksum, vouch.signature.clone()))
            } else {
                None
            };
            (outcome, quorum.status())
        };

        let Some(outcome) = outcome else {
            info!(epoch = %epoch_id, "[ml-05] Checksum verified; not on the council");
            return Ok(status);
        };

        info!(
            epoch = %epoch_id,
            checksum = %short_hash(&checksum),
            "[ml-05] Checksum verified, vouching"
        );
        match self.transport.broadcast(VOUCH_TOPIC, encode(&vouch)?).await {
            Ok(reached) => debug!(epoch = %epoch_id, reached, "[ml-05] Vouch broadcast"),
            Err(e) => warn!(epoch = %epoch_id, error = %e, "[ml-05] Vouch broadcast failed"),
        }
        if outcome == VouchOutcome::HardFinalReached {
            self.complete(epoch_id).await;
        }
        Ok(self.status_of(&epoch_id).unwrap_or(status))
    }

    async fn dispute_own(
        &self,
        epoch_id: EpochId,
        claimed: Hash,
        observed: Hash,
    ) -> CouncilResult<QuorumStatus> {
        let member = self.signer.member();
        let is_member = {
            let mut quorums = self.quorums.lock();
            let quorum = quorums
                .get_mut(&epoch_id)
                .ok_or(CouncilError::UnknownEpoch { epoch_id })?;
            quorum.verification_failed();
            let is_member = quorum.is_member(&member);
            if is_member {
                quorum.record_dispute(DisputeRecord {
                    member,
                    claimed_checksum: claimed,
                    observed_checksum: observed,
                });
            }
            is_member
        };

        error!(
            epoch = %epoch_id,
            claimed = %short_hash(&claimed),
            observed = %short_hash(&observed),
            "[ml-05] Archive disagrees with finalized checksum, refusing to vouch"
        );
        if is_member {
            self.send_dispute(epoch_id, claimed, observed).await?;
        }
        self.bus
            .publish(LedgerEvent::QuorumDisputed {
                epoch_id,
                disputed_by: member,
                claimed_checksum: claimed,
                observed_checksum: observed,
            })
            .await;
        Ok(QuorumStatus::Disputed)
    }

    async fn send_dispute(&self, epoch_id: EpochId, claimed: Hash, observed: Hash) -> CouncilResult<()> {
        let notice = DisputeNotice {
            epoch_id,
            claimed_checksum: claimed,
            observed_checksum: observed,
            member: self.signer.member(),
            signature: self
                .signer
                .sign(&dispute_message(&epoch_id, &claimed, &observed)),
        };
        if let Err(e) = self.transport.broadcast(DISPUTE_TOPIC, encode(&notice)?).await {
            warn!(epoch = %epoch_id, error = %e, "[ml-05] Dispute broadcast failed");
        }
        Ok(())
    }

    /// Hard-final transition: mark the archive and announce it.
    async fn complete(&self, epoch_id: EpochId) {
        let Some(result) = self.quorums.lock().get(&epoch_id).map(|q| q.result().clone()) else {
            return;
        };
        info!(
            epoch = %epoch_id,
            signers = result.authenticated_by.len(),
            threshold = self.config.quorum_threshold,
            "[ml-05] Epoch is hard-final"
        );
        self.mark_archive(&result).await;
        self.bus
            .publish(LedgerEvent::QuorumAuthenticated {
                epoch_id,
                body_checksum: result.body_checksum,
                authenticated_by: result.authenticated_by,
            })
            .await;
    }

    async fn mark_archive(&self, result: &BeheadingResult) {
        let authentication = ArchiveAuthentication {
            authenticated_by: result.authenticated_by.clone(),
            signatures: result.signatures.clone(),
            authenticated_at: self.clock.now_ms().unwrap_or(result.finalized_at),
        };
        match self
            .archive
            .mark_authenticated(&result.epoch_id, authentication)
            .await
        {
            Ok(()) => {
                if let Some(quorum) = self.quorums.lock().get_mut(&result.epoch_id) {
                    quorum.mark_archived();
                }
            }
            Err(e) => warn!(
                epoch = %result.epoch_id,
                error = %e,
                "[ml-05] Could not mark archive authenticated, will retry"
            ),
        }
    }

    fn status_of(&self, epoch_id: &EpochId) -> Option<QuorumStatus> {
        self.quorums.lock().get(epoch_id).map(EpochQuorum::status)
    }

    async fn replay_early(&self, epoch_id: EpochId) {
        let messages = self.early.lock().take_for(&epoch_id);
        if messages.is_empty() {
            return;
        }
        debug!(epoch = %epoch_id, count = messages.len(), "[ml-05] Replaying early council messages");
        for message in messages {
            match message {
                EarlyMessage::Claim { from, claim } => self.handle_claim(from, claim).await,
                EarlyMessage::Vouch(vouch) => {
                    let from = vouch.member;
                    self.handle_vouch(from, vouch).await;
                }
                EarlyMessage::Dispute(notice) => {
                    let from = notice.member;
                    self.handle_dispute(from, notice).await;
                }
            }
        }
    }

    /// Untracked and older than the newest local finalization: either pruned
    /// or skipped over, so it will never be finalized here.
    fn is_stale(quorums: &BTreeMap<EpochId, EpochQuorum>, epoch_id: &EpochId) -> bool {
        !quorums.contains_key(epoch_id)
            && quorums
                .last_key_value()
                .is_some_and(|(newest, _)| epoch_id < newest)
    }

    fn retain_recent(quorums: &mut BTreeMap<EpochId, EpochQuorum>, keep: usize) {
        while quorums.len() > keep.max(1) {
            if quorums.pop_first().is_none() {
                break;
            }
        }
    }
}

#[async_trait]
impl<A: CouncilArchive + 'static> CouncilApi for CouncilService<A> {
    async fn on_local_finalization(&self, result: BeheadingResult) -> CouncilResult<QuorumSnapshot> {
        let epoch_id = result.epoch_id;
        let mut peers = self.transport.known_peers();
        peers.push(self.transport.local_peer());
        let council = select_council(
            result.previous_head_hash.as_ref(),
            &epoch_id,
            &peers,
            self.config.council_size,
        );
        let on_council = council.contains(&self.signer.member());

        {
            let mut quorums = self.quorums.lock();
            if let Some(existing) = quorums.get(&epoch_id) {
                warn!(epoch = %epoch_id, "[ml-05] Epoch already tracked by the council");
                return Ok(existing.snapshot());
            }
            quorums.insert(
                epoch_id,
                EpochQuorum::new(result.clone(), council.clone(), self.config.quorum_threshold),
            );
            Self::retain_recent(&mut quorums, self.config.retained_epochs);
        }
        let discarded = self.early.lock().discard_before(&epoch_id);
        if discarded > 0 {
            debug!(epoch = %epoch_id, discarded, "[ml-05] Dropped early messages for past epochs");
        }
        info!(
            epoch = %epoch_id,
            council = council.len(),
            threshold = self.config.quorum_threshold,
            on_council,
            "[ml-05] Council formed"
        );

        let claim = BeheadingClaim { result };
        match self.transport.broadcast(CLAIM_TOPIC, encode(&claim)?).await {
            Ok(reached) => info!(epoch = %epoch_id, reached, "[ml-05] Claim broadcast"),
            Err(e) => warn!(epoch = %epoch_id, error = %e, "[ml-05] Claim broadcast failed"),
        }

        if let Err(e) = self.verify_and_vouch(epoch_id).await {
            warn!(epoch = %epoch_id, error = %e, "[ml-05] Verification failed, will retry");
        }
        self.replay_early(epoch_id).await;

        self.quorum_status(&epoch_id)
            .ok_or(CouncilError::UnknownEpoch { epoch_id })
    }

    async fn handle_claim(&self, from: PeerId, claim: BeheadingClaim) {
        let epoch_id = claim.result.epoch_id;
        let theirs = claim.result.body_checksum;
        let local = self.signer.member();

        let action = {
            let mut quorums = self.quorums.lock();
            let stale = Self::is_stale(&quorums, &epoch_id);
            match quorums.get_mut(&epoch_id) {
                None if stale => ClaimAction::Ignore,
                None => ClaimAction::Buffer,
                Some(quorum) if quorum.body_checksum() == theirs => match quorum.local_vouch() {
                    Some(vouch) => ClaimAction::Reply(vouch.clone()),
                    None => ClaimAction::Ignore,
                },
                Some(quorum) => {
                    if quorum.is_member(&local) && quorum.note_disputed_claim(theirs) {
                        ClaimAction::Dispute {
                            ours: quorum.body_checksum(),
                        }
                    } else {
                        ClaimAction::Ignore
                    }
                }
            }
        };

        match action {
            ClaimAction::Buffer => {
                debug!(from = %from.short(), epoch = %epoch_id, "[ml-05] Claim for unfinalized epoch buffered");
                self.defer(EarlyMessage::Claim { from, claim });
            }
            ClaimAction::Reply(vouch) => {
                let sent = match encode(&vouch) {
                    Ok(payload) => self.transport.send(&from, VOUCH_TOPIC, payload).await.map_err(CouncilError::from),
                    Err(e) => Err(e),
                };
                if let Err(e) = sent {
                    debug!(to = %from.short(), error = %e, "[ml-05] Vouch reply not delivered");
                }
            }
            ClaimAction::Dispute { ours } => {
                warn!(
                    from = %from.short(),
                    epoch = %epoch_id,
                    claimed = %short_hash(&theirs),
                    observed = %short_hash(&ours),
                    "[ml-05] Peer claim disagrees with our checksum, disputing"
                );
                if let Err(e) = self.send_dispute(epoch_id, theirs, ours).await {
                    warn!(epoch = %epoch_id, error = %e, "[ml-05] Dispute not sent");
                }
                self.bus
                    .publish(LedgerEvent::QuorumDisputed {
                        epoch_id,
                        disputed_by: local,
                        claimed_checksum: theirs,
                        observed_checksum: ours,
                    })
                    .await;
            }
            ClaimAction::Ignore => {}
        }
    }

    async fn handle_vouch(&self, from: PeerId, vouch: Vouch) -> VouchOutcome {
        if !self
            .verifier
            .verify(&vouch.member, &vouch.signing_message(), &vouch.signature)
        {
            warn!(
                from = %from.short(),
                member = %vouch.member.short(),
                epoch = %vouch.epoch_id,
                "[ml-05] Vouch with invalid signature"
            );
            return VouchOutcome::Rejected(VouchRejection::InvalidSignature);
        }

        let epoch_id = vouch.epoch_id;
        let member = vouch.member;
        let outcome = {
            let mut quorums = self.quorums.lock();
            if Self::is_stale(&quorums, &epoch_id) {
                Some(VouchOutcome::Stale)
            } else {
                quorums
                    .get_mut(&epoch_id)
                    .map(|quorum| quorum.add_vouch(member, vouch.body_checksum, vouch.signature.clone()))
            }
        };
        let Some(outcome) = outcome else {
            debug!(member = %member.short(), epoch = %epoch_id, "[ml-05] Vouch for unfinalized epoch buffered");
            self.defer(EarlyMessage::Vouch(vouch));
            return VouchOutcome::Deferred;
        };

        match &outcome {
            VouchOutcome::Accepted { signers } => {
                info!(member = %member.short(), epoch = %epoch_id, signers, "[ml-05] Vouch accepted");
            }
            VouchOutcome::HardFinalReached => {
                info!(member = %member.short(), epoch = %epoch_id, "[ml-05] Vouch completed quorum");
                self.complete(epoch_id).await;
            }
            VouchOutcome::Late | VouchOutcome::Duplicate | VouchOutcome::Stale => {
                debug!(member = %member.short(), epoch = %epoch_id, ?outcome, "[ml-05] Vouch recorded");
            }
            VouchOutcome::Rejected(reason) => {
                warn!(member = %member.short(), epoch = %epoch_id, ?reason, "[ml-05] Vouch rejected");
            }
            VouchOutcome::Deferred => {}
        }
        outcome
    }

    async fn handle_dispute(&self, from: PeerId, notice: DisputeNotice) {
        if !self
            .verifier
            .verify(&notice.member, &notice.signing_message(), &notice.signature)
        {
            warn!(from = %from.short(), member = %notice.member.short(), "[ml-05] Dispute with invalid signature");
            return;
        }

        let epoch_id = notice.epoch_id;
        let recorded = {
            let mut quorums = self.quorums.lock();
            if Self::is_stale(&quorums, &epoch_id) {
                debug!(member = %notice.member.short(), epoch = %epoch_id, "[ml-05] Dispute for a past epoch ignored");
                return;
            }
            quorums.get_mut(&epoch_id).map(|quorum| {
                quorum.record_dispute(DisputeRecord {
                    member: notice.member,
                    claimed_checksum: notice.claimed_checksum,
                    observed_checksum: notice.observed_checksum,
                })
            })
        };

        match recorded {
            None => {
                debug!(member = %notice.member.short(), epoch = %epoch_id, "[ml-05] Dispute for unfinalized epoch buffered");
                self.defer(EarlyMessage::Dispute(notice));
            }
            Some(false) => {
                debug!(member = %notice.member.short(), epoch = %epoch_id, "[ml-05] Dispute ignored (repeat or not on council)");
            }
            Some(true) => {
                warn!(
                    member = %notice.member.short(),
                    epoch = %epoch_id,
                    claimed = %short_hash(&notice.claimed_checksum),
                    observed = %short_hash(&notice.observed_checksum),
                    "[ml-05] Council member disputes checksum"
                );
                self.bus
                    .publish(LedgerEvent::QuorumDisputed {
                        epoch_id,
                        disputed_by: notice.member,
                        claimed_checksum: notice.claimed_checksum,
                        observed_checksum: notice.observed_checksum,
                    })
                    .await;
            }
        }
    }

    async fn retry_pending(&self) -> usize {
        let (unverified, unmarked): (Vec<EpochId>, Vec<BeheadingResult>) = {
            let quorums = self.quorums.lock();
            (
                quorums
                    .values()
                    .filter(|q| q.needs_verification())
                    .map(EpochQuorum::epoch_id)
                    .collect(),
                quorums
                    .values()
                    .filter(|q| q.needs_archive_mark())
                    .map(|q| q.result().clone())
                    .collect(),
            )
        };

        for epoch_id in &unverified {
            if let Err(e) = self.verify_and_vouch(*epoch_id).await {
                warn!(epoch = %epoch_id, error = %e, "[ml-05] Verification retry failed");
            }
        }
        for result in &unmarked {
            self.mark_archive(result).await;
        }
        unverified.len() + unmarked.len()
    }

    fn quorum_status(&self, epoch_id: &EpochId) -> Option<QuorumSnapshot> {
        self.quorums.lock().get(epoch_id).map(EpochQuorum::snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{Ed25519ChecksumSigner, Ed25519VouchVerifier};
    use ml_01_epoch_clock::{ManualTimeSource, DEFAULT_FINALIZATION_WINDOW};
    use shared_bus::{EventFilter, EventTopic, InMemoryEventBus};
    use shared_crypto::Ed25519KeyPair;
    use shared_types::{
        ArchiveRecord, MatchRecord, MorgueId, SinkError, StoredArchive, TopicHandler,
        TransportError,
    };
    use std::collections::HashMap;

    struct RecordingTransport {
        local: PeerId,
        peers: Vec<PeerId>,
        sent: Mutex<Vec<(Option<PeerId>, String, Vec<u8>)>>,
    }

    impl RecordingTransport {
        fn on_topic(&self, topic: &str) -> usize {
            self.sent.lock().iter().filter(|(_, t, _)| t == topic).count()
        }
    }

    #[async_trait]
    impl PeerTransport for RecordingTransport {
        fn local_peer(&self) -> PeerId {
            self.local
        }

        fn known_peers(&self) -> Vec<PeerId> {
            self.peers.clone()
        }

        async fn broadcast(&self, topic: &str, payload: Vec<u8>) -> Result<usize, TransportError> {
            self.sent.lock().push((None, topic.to_string(), payload));
            Ok(self.peers.len())
        }

        async fn send(&self, peer: &PeerId, topic: &str, payload: Vec<u8>) -> Result<(), TransportError> {
            self.sent.lock().push((Some(*peer), topic.to_string(), payload));
            Ok(())
        }

        fn register_handler(&self, _topic: &str, _handler: Arc<dyn TopicHandler>) {}
    }

    #[derive(Default)]
    struct MockArchive {
        archives: Mutex<HashMap<EpochId, StoredArchive>>,
        marked: Mutex<Vec<EpochId>>,
    }

    #[async_trait]
    impl CouncilArchive for MockArchive {
        async fn archive_by_epoch(&self, epoch_id: &EpochId) -> Result<Option<StoredArchive>, SinkError> {
            Ok(self.archives.lock().get(epoch_id).cloned())
        }

        async fn mark_authenticated(
            &self,
            epoch_id: &EpochId,
            authentication: ArchiveAuthentication,
        ) -> Result<(), SinkError> {
            let mut archives = self.archives.lock();
            let archive = archives
                .get_mut(epoch_id)
                .ok_or_else(|| SinkError::NotFound(epoch_id.to_string()))?;
            archive.authentication = Some(authentication);
            self.marked.lock().push(*epoch_id);
            Ok(())
        }
    }

    fn keypair(n: u8) -> Ed25519KeyPair {
        Ed25519KeyPair::from_seed([n; 32])
    }

    fn peer(n: u8) -> PeerId {
        Ed25519ChecksumSigner::new(keypair(n)).member()
    }

    fn epoch() -> EpochId {
        EpochId::parse("2025-01-01").unwrap()
    }

    fn matches() -> Vec<MatchRecord> {
        (0..3)
            .map(|i| {
                MatchRecord::new(format!("m{i}"), "lvl", vec!["a".into()], 0, 1_000, PeerId([1u8; 32]))
                    .sealed()
                    .unwrap()
            })
            .collect()
    }

    /// Archive `body` and return the result that claims `claimed` matches.
    fn archived(archive: &MockArchive, body: &[MatchRecord], claimed: &[MatchRecord]) -> BeheadingResult {
        let codec = MorgueCodec::default();
        let encoded = codec.encode(body).unwrap();
        let checksum = body_checksum(claimed).unwrap();
        archive.archives.lock().insert(
            epoch(),
            StoredArchive {
                morgue_id: MorgueId::new("m-1"),
                record: ArchiveRecord {
                    epoch_id: epoch(),
                    head_hash: [1u8; 32],
                    previous_head_hash: None,
                    body_checksum: checksum,
                    match_count: claimed.len() as u64,
                    total_players: 3,
                    total_time_played: 3_000,
                    body_size: encoded.raw_size,
                    compressed_body: encoded.bytes,
                    epoch_created_at: 0,
                    finalized_at: 10,
                },
                authentication: None,
            },
        );
        BeheadingResult {
            epoch_id: epoch(),
            head_hash: [1u8; 32],
            previous_head_hash: None,
            body_checksum: checksum,
            match_count: claimed.len() as u64,
            morgue_id: MorgueId::new("m-1"),
            authenticated_by: Vec::new(),
            signatures: BTreeMap::new(),
            finalized_at: 10,
        }
    }

    struct Fixture {
        service: CouncilService<MockArchive>,
        transport: Arc<RecordingTransport>,
        archive: Arc<MockArchive>,
        bus: Arc<InMemoryEventBus>,
    }

    /// Local peer 1 in a swarm of `n`; council covers everyone.
    fn fixture(n: u8, threshold: usize) -> Fixture {
        fixture_retaining(n, threshold, CouncilConfig::default().retained_epochs)
    }

    fn fixture_retaining(n: u8, threshold: usize, retained_epochs: usize) -> Fixture {
        let transport = Arc::new(RecordingTransport {
            local: peer(1),
            peers: (2..=n).map(peer).collect(),
            sent: Mutex::new(Vec::new()),
        });
        let archive = Arc::new(MockArchive::default());
        let bus = Arc::new(InMemoryEventBus::new());
        let service = CouncilService::new(
            transport.clone(),
            archive.clone(),
            Arc::new(Ed25519ChecksumSigner::new(keypair(1))),
            Arc::new(Ed25519VouchVerifier),
            bus.clone(),
            EpochClock::new(
                Arc::new(ManualTimeSource::new(1_735_776_000_000)),
                DEFAULT_FINALIZATION_WINDOW,
            ),
            MorgueCodec::default(),
            CouncilConfig {
                council_size: n as usize,
                quorum_threshold: threshold,
                retained_epochs,
                ..CouncilConfig::default()
            },
        );
        Fixture {
            service,
            transport,
            archive,
            bus,
        }
    }

    fn vouch_from(n: u8, checksum: Hash) -> Vouch {
        let signer = Ed25519ChecksumSigner::new(keypair(n));
        Vouch {
            epoch_id: epoch(),
            body_checksum: checksum,
            member: signer.member(),
            signature: signer.sign(&vouch_message(&epoch(), &checksum)),
        }
    }

    #[tokio::test]
    async fn test_local_finalization_claims_and_vouches() {
        let f = fixture(5, 3);
        let result = archived(&f.archive, &matches(), &matches());

        let snapshot = f.service.on_local_finalization(result).await.unwrap();
        assert_eq!(snapshot.status, QuorumStatus::Vouching);
        assert_eq!(snapshot.signers, vec![peer(1)]);
        assert_eq!(snapshot.council.len(), 5);
        assert_eq!(f.transport.on_topic(CLAIM_TOPIC), 1);
        assert_eq!(f.transport.on_topic(VOUCH_TOPIC), 1);
    }

    #[tokio::test]
    async fn test_threshold_marks_archive_and_announces() {
        let f = fixture(5, 3);
        let result = archived(&f.archive, &matches(), &matches());
        let checksum = result.body_checksum;
        let mut events = f.bus.subscribe(EventFilter::topics(vec![EventTopic::Council]));
        f.service.on_local_finalization(result).await.unwrap();

        assert_eq!(
            f.service.handle_vouch(peer(2), vouch_from(2, checksum)).await,
            VouchOutcome::Accepted { signers: 2 }
        );
        assert_eq!(
            f.service.handle_vouch(peer(3), vouch_from(3, checksum)).await,
            VouchOutcome::HardFinalReached
        );
        assert_eq!(
            f.service.handle_vouch(peer(4), vouch_from(4, checksum)).await,
            VouchOutcome::Late
        );

        let status = f.service.quorum_status(&epoch()).unwrap();
        assert_eq!(status.status, QuorumStatus::HardFinal);
        assert_eq!(status.signers.len(), 4);
        assert_eq!(*f.archive.marked.lock(), vec![epoch()]);
        assert!(matches!(
            events.try_recv(),
            Ok(Some(LedgerEvent::QuorumAuthenticated { .. }))
        ));
    }

    #[tokio::test]
    async fn test_forged_vouch_rejected() {
        let f = fixture(5, 3);
        let result = archived(&f.archive, &matches(), &matches());
        let checksum = result.body_checksum;
        f.service.on_local_finalization(result).await.unwrap();

        let mut forged = vouch_from(2, checksum);
        forged.member = peer(3);
        assert_eq!(
            f.service.handle_vouch(peer(2), forged).await,
            VouchOutcome::Rejected(VouchRejection::InvalidSignature)
        );
    }

    #[tokio::test]
    async fn test_early_vouch_applied_after_finalization() {
        let f = fixture(3, 2);
        let result = archived(&f.archive, &matches(), &matches());
        let checksum = result.body_checksum;

        assert_eq!(
            f.service.handle_vouch(peer(2), vouch_from(2, checksum)).await,
            VouchOutcome::Deferred
        );
        assert_eq!(f.service.early_messages(), 1);

        f.service.on_local_finalization(result).await.unwrap();
        assert_eq!(f.service.early_messages(), 0);
        assert_eq!(
            f.service.quorum_status(&epoch()).unwrap().status,
            QuorumStatus::HardFinal
        );
    }

    #[tokio::test]
    async fn test_traffic_for_pruned_epoch_dropped() {
        let f = fixture_retaining(3, 2, 1);
        let first = archived(&f.archive, &matches(), &matches());
        let checksum = first.body_checksum;
        let second = BeheadingResult {
            epoch_id: EpochId::parse("2025-01-02").unwrap(),
            previous_head_hash: Some(first.head_hash),
            ..first.clone()
        };

        f.service.on_local_finalization(first).await.unwrap();
        f.service.on_local_finalization(second).await.unwrap();
        assert!(f.service.quorum_status(&epoch()).is_none());

        assert_eq!(
            f.service.handle_vouch(peer(2), vouch_from(2, checksum)).await,
            VouchOutcome::Stale
        );
        let signer = Ed25519ChecksumSigner::new(keypair(3));
        let notice = DisputeNotice {
            epoch_id: epoch(),
            claimed_checksum: checksum,
            observed_checksum: [9u8; 32],
            member: signer.member(),
            signature: signer.sign(&dispute_message(&epoch(), &checksum, &[9u8; 32])),
        };
        f.service.handle_dispute(peer(3), notice).await;
        let claim = BeheadingClaim {
            result: archived(&f.archive, &matches(), &matches()),
        };
        f.service.handle_claim(peer(2), claim).await;

        assert_eq!(f.service.early_messages(), 0);
    }

    #[tokio::test]
    async fn test_finalization_discards_early_messages_for_past_epochs() {
        let f = fixture(3, 2);
        let first = archived(&f.archive, &matches(), &matches());
        let checksum = first.body_checksum;
        let second = BeheadingResult {
            epoch_id: EpochId::parse("2025-01-02").unwrap(),
            ..first
        };

        // Early for 2025-01-01, which this peer skips over.
        assert_eq!(
            f.service.handle_vouch(peer(2), vouch_from(2, checksum)).await,
            VouchOutcome::Deferred
        );
        f.service.on_local_finalization(second).await.unwrap();
        assert_eq!(f.service.early_messages(), 0);
    }

    #[tokio::test]
    async fn test_tampered_archive_disputes() {
        let f = fixture(5, 3);
        let mut tampered = matches();
        tampered.pop();
        let result = archived(&f.archive, &tampered, &matches());
        let mut events = f.bus.subscribe(EventFilter::topics(vec![EventTopic::Council]));

        let snapshot = f.service.on_local_finalization(result).await.unwrap();
        assert_eq!(snapshot.status, QuorumStatus::Disputed);
        assert!(snapshot.signers.is_empty());
        assert_eq!(snapshot.disputes.len(), 1);
        assert_eq!(f.transport.on_topic(VOUCH_TOPIC), 0);
        assert_eq!(f.transport.on_topic(DISPUTE_TOPIC), 1);
        assert!(matches!(
            events.try_recv(),
            Ok(Some(LedgerEvent::QuorumDisputed { .. }))
        ));
    }

    #[tokio::test]
    async fn test_missing_archive_retried() {
        let f = fixture(3, 2);
        let result = archived(&f.archive, &matches(), &matches());
        let saved = f.archive.archives.lock().remove(&epoch()).unwrap();

        let snapshot = f.service.on_local_finalization(result).await.unwrap();
        assert_eq!(snapshot.status, QuorumStatus::Verifying);

        f.archive.archives.lock().insert(epoch(), saved);
        assert_eq!(f.service.retry_pending().await, 1);
        assert_eq!(
            f.service.quorum_status(&epoch()).unwrap().status,
            QuorumStatus::Vouching
        );
    }

    #[tokio::test]
    async fn test_foreign_dispute_recorded_not_blocking() {
        let f = fixture(5, 2);
        let result = archived(&f.archive, &matches(), &matches());
        let checksum = result.body_checksum;
        f.service.on_local_finalization(result).await.unwrap();

        let signer = Ed25519ChecksumSigner::new(keypair(4));
        let notice = DisputeNotice {
            epoch_id: epoch(),
            claimed_checksum: checksum,
            observed_checksum: [0u8; 32],
            member: signer.member(),
            signature: signer.sign(&dispute_message(&epoch(), &checksum, &[0u8; 32])),
        };
        f.service.handle_dispute(peer(4), notice).await;
        assert_eq!(
            f.service.handle_vouch(peer(2), vouch_from(2, checksum)).await,
            VouchOutcome::HardFinalReached
        );

        let status = f.service.quorum_status(&epoch()).unwrap();
        assert_eq!(status.status, QuorumStatus::HardFinal);
        assert_eq!(status.disputes.len(), 1);
    }

    #[tokio::test]
    async fn test_conflicting_claim_disputed_once() {
        let f = fixture(3, 2);
        let result = archived(&f.archive, &matches(), &matches());
        f.service.on_local_finalization(result.clone()).await.unwrap();

        let mut other = result;
        other.body_checksum = [7u8; 32];
        let claim = BeheadingClaim { result: other };
        f.service.handle_claim(peer(2), claim.clone()).await;
        f.service.handle_claim(peer(3), claim).await;
        assert_eq!(f.transport.on_topic(DISPUTE_TOPIC), 1);
    }

    #[tokio::test]
    async fn test_matching_claim_answered_with_vouch() {
        let f = fixture(3, 3);
        let result = archived(&f.archive, &matches(), &matches());
        f.service.on_local_finalization(result.clone()).await.unwrap();

        f.service.handle_claim(peer(2), BeheadingClaim { result }).await;
        let direct = f
            .transport
            .sent
            .lock()
            .iter()
            .filter(|(to, topic, _)| *to == Some(peer(2)) && topic == VOUCH_TOPIC)
            .count();
        assert_eq!(direct, 1);
    }
}
