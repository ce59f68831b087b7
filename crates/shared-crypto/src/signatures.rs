//! # Ed25519 Signatures
//!
//! Council members sign body checksums with Ed25519. The verifying key
//! doubles as the peer identifier, so verification needs no key directory.

use crate::CryptoError;
use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use zeroize::Zeroize;

/// Length of a seed, a public key and a peer id.
pub const KEY_LEN: usize = 32;
/// Length of a detached signature.
pub const SIGNATURE_LEN: usize = 64;

/// A peer's verifying key. Always a valid curve point.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Ed25519PublicKey([u8; KEY_LEN]);

impl Ed25519PublicKey {
    /// Accepts only bytes that decode to a curve point.
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Result<Self, CryptoError> {
        decode_key(&bytes)?;
        Ok(Self(bytes))
    }

    /// Raw key bytes, as carried in `PeerId`.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }

    /// `Ok(())` when `signature` was produced over `message` by this key.
    pub fn verify(&self, message: &[u8], signature: &Ed25519Signature) -> Result<(), CryptoError> {
        let detached = ed25519_dalek::Signature::from_bytes(&signature.0);
        decode_key(&self.0)?
            .verify(message, &detached)
            .map_err(|_| CryptoError::SignatureVerificationFailed)
    }
}

fn decode_key(bytes: &[u8; KEY_LEN]) -> Result<VerifyingKey, CryptoError> {
    VerifyingKey::from_bytes(bytes).map_err(|_| CryptoError::InvalidPublicKey)
}

/// Detached signature as carried in vouch and dispute messages.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ed25519Signature([u8; SIGNATURE_LEN]);

impl Ed25519Signature {
    /// Wrap raw bytes. Validity is only checked on verify.
    pub fn from_bytes(bytes: [u8; SIGNATURE_LEN]) -> Self {
        Self(bytes)
    }

    /// Parse a signature off the wire. Anything but 64 bytes is refused.
    pub fn from_slice(wire: &[u8]) -> Result<Self, CryptoError> {
        <[u8; SIGNATURE_LEN]>::try_from(wire)
            .map(Self)
            .map_err(|_| CryptoError::InvalidSignatureFormat(wire.len()))
    }

    /// Raw signature bytes.
    pub fn as_bytes(&self) -> &[u8; SIGNATURE_LEN] {
        &self.0
    }

    /// Owned bytes for wire messages.
    pub fn to_vec(&self) -> Vec<u8> {
        self.0.to_vec()
    }
}

/// A peer's signing identity.
pub struct Ed25519KeyPair {
    secret: SigningKey,
}

impl Ed25519KeyPair {
    /// Fresh identity from the OS RNG, used when no seed is configured.
    pub fn generate() -> Self {
        Self {
            secret: SigningKey::generate(&mut rand::thread_rng()),
        }
    }

    /// Deterministic identity from a 32-byte seed.
    pub fn from_seed(seed: [u8; KEY_LEN]) -> Self {
        Self {
            secret: SigningKey::from_bytes(&seed),
        }
    }

    /// Identity from the hex seed in `identity.seed_hex`.
    pub fn from_hex_seed(seed: &str) -> Result<Self, CryptoError> {
        let mut decoded =
            hex::decode(seed.trim()).map_err(|e| CryptoError::InvalidSeed(e.to_string()))?;
        let parsed = <[u8; KEY_LEN]>::try_from(decoded.as_slice());
        decoded.zeroize();

        let mut seed = parsed
            .map_err(|_| CryptoError::InvalidSeed(format!("expected {KEY_LEN} bytes")))?;
        let keypair = Self::from_seed(seed);
        seed.zeroize();
        Ok(keypair)
    }

    /// The verifying key, i.e. this peer's id.
    pub fn public_key(&self) -> Ed25519PublicKey {
        Ed25519PublicKey(self.secret.verifying_key().to_bytes())
    }

    /// Signing is deterministic: same key and message, same signature.
    pub fn sign(&self, message: &[u8]) -> Ed25519Signature {
        Ed25519Signature(self.secret.sign(message).to_bytes())
    }

    /// Seed bytes, for writing the identity back to config.
    pub fn to_seed(&self) -> [u8; KEY_LEN] {
        self.secret.to_bytes()
    }
}

impl Drop for Ed25519KeyPair {
    fn drop(&mut self) {
        let mut seed = self.secret.to_bytes();
        seed.zeroize();
    }
}
