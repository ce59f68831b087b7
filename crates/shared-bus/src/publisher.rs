//! # Event Publisher
//!
//! One `InMemoryEventBus` per peer. Subsystems publish, the head broadcaster,
//! the query surface and tests subscribe.

use crate::events::{EventFilter, EventTopic, LedgerEvent};
use crate::subscriber::{EventStream, Subscription};
use crate::DEFAULT_CHANNEL_CAPACITY;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, trace};

/// Publishing side of the bus, as seen by subsystems.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Returns the number of subscribers the event was handed to.
    async fn publish(&self, event: LedgerEvent) -> usize;
}

/// `tokio::sync::broadcast` bus. Filtering happens on the receiving side.
pub struct InMemoryEventBus {
    sender: broadcast::Sender<LedgerEvent>,
    published: Mutex<HashMap<EventTopic, u64>>,
    live: Arc<AtomicUsize>,
    capacity: usize,
}

impl InMemoryEventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// `capacity` events are buffered per subscriber before it lags.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            published: Mutex::new(HashMap::new()),
            live: Arc::new(AtomicUsize::new(0)),
            capacity: capacity.max(1),
        }
    }

    /// Subscribe to events matching `filter`. Dropping the handle
    /// unsubscribes.
    #[must_use]
    pub fn subscribe(&self, filter: EventFilter) -> Subscription {
        let live = self.live.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(topics = ?filter.topics, epochs = filter.epochs.len(), live, "Subscription opened");
        Subscription::new(self.sender.subscribe(), filter, Arc::clone(&self.live))
    }

    /// Same as [`subscribe`](Self::subscribe), as a `Stream`.
    #[must_use]
    pub fn event_stream(&self, filter: EventFilter) -> EventStream {
        EventStream::new(self.subscribe(filter))
    }

    /// Subscriptions and streams currently open.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.live.load(Ordering::Relaxed)
    }

    /// Events published on `topic` so far.
    #[must_use]
    pub fn published(&self, topic: EventTopic) -> u64 {
        let published = self.published.lock();
        match topic {
            EventTopic::All => published.values().sum(),
            topic => published.get(&topic).copied().unwrap_or(0),
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, event: LedgerEvent) -> usize {
        let topic = event.topic();
        let epoch = event.epoch_id();
        *self.published.lock().entry(topic).or_insert(0) += 1;

        match self.sender.send(event) {
            Ok(receivers) => {
                trace!(?topic, %epoch, receivers, "Event published");
                receivers
            }
            // A headless peer has no listeners.
            Err(_) => 0,
        }
    }
}
