//! # Match Ledger Test Suite
//!
//! Cross-subsystem flows with several peers in one process.
//!
//! ```text
//! tests/src/
//! ├── harness.rs        # Swarm of LedgerNodes over a LoopbackNetwork
//! └── integration/      # Multi-peer scenarios
//!     ├── genesis.rs
//!     ├── rollover.rs
//!     ├── council.rs
//!     ├── divergence.rs
//!     └── startup_sync.rs
//! ```
//!
//! ```bash
//! cargo test -p ml-tests
//! cargo test -p ml-tests integration::council
//! ```

pub mod harness;
pub mod integration;
