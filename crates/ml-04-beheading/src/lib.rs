//! # ml-04-beheading
//!
//! Finalization ("beheading") of the live epoch at the daily boundary.
//!
//! ```text
//! EpochClock tick ──check_rollover──→ BeheadingService
//!                                        │ begin_rollover (guard)
//!                                        │ head hash, body checksum
//!                                        │ zstd(bincode(body)) ──insert──→ morgue
//!                                        │ commit_rollover (new epoch chained)
//!                                        └──FinalizationComplete──→ bus ──→ council
//! ```
//!
//! A failed step aborts the rollover. The old epoch stays live and the
//! next tick tries again.

pub mod domain;
pub mod error;
pub mod ports;
pub mod query;
pub mod service;

pub use domain::{EncodedBody, MorgueCodec, DEFAULT_COMPRESSION_LEVEL, MORGUE_FORMAT_V1};
pub use error::{BeheadingError, FinalizationResult};
pub use ports::{BeheadingApi, MorgueReader, MorgueWriter};
pub use query::{MorgueQueryService, DEFAULT_MAX_PAGE_SIZE};
pub use service::BeheadingService;
