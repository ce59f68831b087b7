//! Domain layer for Beheading.

pub mod codec;

pub use codec::{EncodedBody, MorgueCodec, DEFAULT_COMPRESSION_LEVEL, MORGUE_FORMAT_V1};
