//! Outstanding sync requests awaiting a `HeadUpdate` reply.

use parking_lot::Mutex;
use shared_types::{HeadSnapshot, PeerId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::oneshot;
use tracing::debug;

struct PendingSync {
    peer: PeerId,
    sender: oneshot::Sender<HeadSnapshot>,
}

/// Maps request ids to waiting callers.
#[derive(Default)]
pub struct PendingSyncs {
    next_id: AtomicU64,
    pending: Mutex<HashMap<u64, PendingSync>>,
}

impl PendingSyncs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a request to `peer` and get the reply receiver.
    pub fn register(&self, peer: PeerId) -> (u64, oneshot::Receiver<HeadSnapshot>) {
        let request_id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let (sender, receiver) = oneshot::channel();
        self.pending
            .lock()
            .insert(request_id, PendingSync { peer, sender });
        (request_id, receiver)
    }

    /// Deliver a reply. Only the peer the request went to may answer it.
    pub fn complete(&self, request_id: u64, from: PeerId, head: HeadSnapshot) -> bool {
        let mut pending = self.pending.lock();
        match pending.get(&request_id) {
            Some(entry) if entry.peer == from => {}
            Some(_) => {
                debug!(request_id, from = %from.short(), "[ml-03] Sync reply from wrong peer ignored");
                return false;
            }
            None => return false,
        }
        match pending.remove(&request_id) {
            Some(entry) => entry.sender.send(head).is_ok(),
            None => false,
        }
    }

    /// Drop a request that timed out or failed to send.
    pub fn cancel(&self, request_id: u64) {
        self.pending.lock().remove(&request_id);
    }

    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }
}
