//! Transport topic handlers.
//!
//! Handlers hold a weak reference so the transport does not keep the
//! service alive after the node shuts down.

use crate::domain::messages::{decode, HeadUpdate, SyncRequest};
use crate::ports::{LocalHeadProvider, PropagationApi};
use crate::service::PropagationService;
use async_trait::async_trait;
use shared_types::{PeerId, TopicHandler};
use std::sync::Weak;
use tracing::{debug, warn};

/// Routes `ledger.head-update` messages into the service.
pub struct HeadUpdateHandler<H: LocalHeadProvider + 'static> {
    service: Weak<PropagationService<H>>,
}

impl<H: LocalHeadProvider + 'static> HeadUpdateHandler<H> {
    pub fn new(service: Weak<PropagationService<H>>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl<H: LocalHeadProvider + 'static> TopicHandler for HeadUpdateHandler<H> {
    async fn on_message(&self, from: PeerId, payload: Vec<u8>) {
        let Some(service) = self.service.upgrade() else {
            return;
        };
        match decode::<HeadUpdate>(&payload) {
            Ok(update) => {
                service.handle_head_update(from, update).await;
            }
            Err(e) => warn!(from = %from.short(), error = %e, "[ml-03] Malformed head update"),
        }
    }
}

/// Routes `ledger.sync-request` messages into the service.
pub struct SyncRequestHandler<H: LocalHeadProvider + 'static> {
    service: Weak<PropagationService<H>>,
}

impl<H: LocalHeadProvider + 'static> SyncRequestHandler<H> {
    pub fn new(service: Weak<PropagationService<H>>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl<H: LocalHeadProvider + 'static> TopicHandler for SyncRequestHandler<H> {
    async fn on_message(&self, from: PeerId, payload: Vec<u8>) {
        let Some(service) = self.service.upgrade() else {
            return;
        };
        let request = match decode::<SyncRequest>(&payload) {
            Ok(request) => request,
            Err(e) => {
                warn!(from = %from.short(), error = %e, "[ml-03] Malformed sync request");
                return;
            }
        };
        if let Err(e) = service.handle_sync_request(from, request).await {
            debug!(from = %from.short(), error = %e, "[ml-03] Sync reply not delivered");
        }
    }
}
