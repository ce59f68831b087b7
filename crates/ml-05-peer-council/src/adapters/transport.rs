//! Transport topic handlers for council traffic.

use crate::domain::messages::{decode, BeheadingClaim, DisputeNotice, Vouch};
use crate::ports::{CouncilApi, CouncilArchive};
use crate::service::CouncilService;
use async_trait::async_trait;
use shared_types::{PeerId, TopicHandler};
use std::sync::Weak;
use tracing::warn;

pub struct ClaimHandler<A: CouncilArchive + 'static> {
    service: Weak<CouncilService<A>>,
}

impl<A: CouncilArchive + 'static> ClaimHandler<A> {
    pub fn new(service: Weak<CouncilService<A>>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl<A: CouncilArchive + 'static> TopicHandler for ClaimHandler<A> {
    async fn on_message(&self, from: PeerId, payload: Vec<u8>) {
        let Some(service) = self.service.upgrade() else {
            return;
        };
        match decode::<BeheadingClaim>(&payload) {
            Ok(claim) => service.handle_claim(from, claim).await,
            Err(e) => warn!(from = %from.short(), error = %e, "[ml-05] Malformed claim"),
        }
    }
}

pub struct VouchHandler<A: CouncilArchive + 'static> {
    service: Weak<CouncilService<A>>,
}

impl<A: CouncilArchive + 'static> VouchHandler<A> {
    pub fn new(service: Weak<CouncilService<A>>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl<A: CouncilArchive + 'static> TopicHandler for VouchHandler<A> {
    async fn on_message(&self, from: PeerId, payload: Vec<u8>) {
        let Some(service) = self.service.upgrade() else {
            return;
        };
        match decode::<Vouch>(&payload) {
            Ok(vouch) => {
                service.handle_vouch(from, vouch).await;
            }
            Err(e) => warn!(from = %from.short(), error = %e, "[ml-05] Malformed vouch"),
        }
    }
}

pub struct DisputeHandler<A: CouncilArchive + 'static> {
    service: Weak<CouncilService<A>>,
}

impl<A: CouncilArchive + 'static> DisputeHandler<A> {
    pub fn new(service: Weak<CouncilService<A>>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl<A: CouncilArchive + 'static> TopicHandler for DisputeHandler<A> {
    async fn on_message(&self, from: PeerId, payload: Vec<u8>) {
        let Some(service) = self.service.upgrade() else {
            return;
        };
        match decode::<DisputeNotice>(&payload) {
            Ok(notice) => service.handle_dispute(from, notice).await,
            Err(e) => warn!(from = %from.short(), error = %e, "[ml-05] Malformed dispute"),
        }
    }
}
