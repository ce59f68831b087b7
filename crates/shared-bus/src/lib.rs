//! # Shared Bus - In-Process Event Bus
//!
//! Carries ledger events from the subsystems to whoever listens: the
//! propagation layer, UIs and tests.
//!
//! ```text
//! ┌──────────────┐                    ┌──────────────┐
//! │ Ledger Store │                    │  UI / Tests  │
//! │  Beheading   │    publish()       │ Propagation  │
//! │   Council    │ ──────┐            │              │
//! └──────────────┘       │            └──────────────┘
//!                        ▼                    ↑
//!                  ┌──────────────┐          │
//!                  │  Event Bus   │          │
//!                  │              │ ─────────┘
//!                  └──────────────┘  subscribe()
//! ```
//!
//! Subscriptions are handles: dropping one unsubscribes it.

#![allow(clippy::missing_const_for_fn)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod events;
pub mod publisher;
pub mod subscriber;

pub use events::{EventFilter, EventTopic, LedgerEvent};
pub use publisher::{EventPublisher, InMemoryEventBus};
pub use subscriber::{EventStream, Subscription, SubscriptionError};

/// Events buffered per subscriber before it lags.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;
