//! Driven Ports (SPI - Outbound Dependencies)
//!
//! The peer transport port lives in `shared_types::transport`; it is
//! shared with the council.

use shared_types::HeadSnapshot;

/// Read-only view of the local Head.
pub trait LocalHeadProvider: Send + Sync {
    fn head_snapshot(&self) -> HeadSnapshot;
}
