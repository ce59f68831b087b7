//! # Event Subscriber
//!
//! Receiving side of the bus: a pull-style `Subscription` and a
//! `Stream`-style `EventStream`. Both apply their `EventFilter` locally and
//! skip over events lost to lag.

use crate::events::{EventFilter, LedgerEvent};
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use thiserror::Error;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::Stream;
use tracing::warn;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    #[error("Event bus closed")]
    Closed,
}

/// Keeps the bus's live-subscription count honest.
struct LiveGuard(Arc<AtomicUsize>);

impl Drop for LiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Filtered receiver. Unsubscribes on drop.
pub struct Subscription {
    receiver: broadcast::Receiver<LedgerEvent>,
    filter: EventFilter,
    guard: LiveGuard,
}

impl Subscription {
    pub(crate) fn new(
        receiver: broadcast::Receiver<LedgerEvent>,
        filter: EventFilter,
        live: Arc<AtomicUsize>,
    ) -> Self {
        Self {
            receiver,
            filter,
            guard: LiveGuard(live),
        }
    }

    /// Next matching event, or `None` once the bus is gone.
    pub async fn recv(&mut self) -> Option<LedgerEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if self.filter.matches(&event) => return Some(event),
                Ok(_) => {}
                Err(RecvError::Lagged(missed)) => {
                    warn!(missed, "Subscriber lagged, events dropped");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Next matching event if one is queued.
    pub fn try_recv(&mut self) -> Result<Option<LedgerEvent>, SubscriptionError> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if self.filter.matches(&event) => return Ok(Some(event)),
                Ok(_) | Err(TryRecvError::Lagged(_)) => {}
                Err(TryRecvError::Empty) => return Ok(None),
                Err(TryRecvError::Closed) => return Err(SubscriptionError::Closed),
            }
        }
    }

    /// Every matching event queued right now.
    pub fn drain(&mut self) -> Vec<LedgerEvent> {
        std::iter::from_fn(|| self.try_recv().ok().flatten()).collect()
    }

    #[must_use]
    pub fn filter(&self) -> &EventFilter {
        &self.filter
    }
}

/// `Stream` over a subscription, for `select!` loops and combinators.
pub struct EventStream {
    inner: BroadcastStream<LedgerEvent>,
    filter: EventFilter,
    _guard: LiveGuard,
}

impl EventStream {
    #[must_use]
    pub fn new(subscription: Subscription) -> Self {
        let Subscription {
            receiver,
            filter,
            guard,
        } = subscription;
        Self {
            inner: BroadcastStream::new(receiver),
            filter,
            _guard: guard,
        }
    }
}

impl Stream for EventStream {
    type Item = LedgerEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            match Pin::new(&mut self.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(event))) if self.filter.matches(&event) => {
                    return Poll::Ready(Some(event))
                }
                Poll::Ready(Some(_)) => continue,
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
