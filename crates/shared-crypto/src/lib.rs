//! # Shared Crypto - Ledger Cryptographic Primitives
//!
//! ## Components
//!
//! | Module | Algorithm | Use Case |
//! |--------|-----------|----------|
//! | `hashing` | SHA-256 | Head chaining, body checksums, council seeds |
//! | `signatures` | Ed25519 | Council vouches and disputes, peer identity |
//!
//! ## Security Properties
//!
//! - **Ed25519**: Deterministic nonces, no RNG dependency when signing
//! - **SHA-256**: Domain-separated, length-prefixed framing

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod errors;
pub mod hashing;
pub mod signatures;

// Re-exports
pub use errors::CryptoError;
pub use hashing::{sha256, Sha256Hasher};
pub use signatures::{Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature, KEY_LEN, SIGNATURE_LEN};
