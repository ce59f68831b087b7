//! Ed25519 adapters for the signer and verifier ports.

use crate::ports::{ChecksumSigner, VouchVerifier};
use shared_crypto::{Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature};
use shared_types::PeerId;
use tracing::debug;

/// Signs with the node's identity key; the member id is its public key.
pub struct Ed25519ChecksumSigner {
    keypair: Ed25519KeyPair,
}

impl Ed25519ChecksumSigner {
    pub fn new(keypair: Ed25519KeyPair) -> Self {
        Self { keypair }
    }
}

impl ChecksumSigner for Ed25519ChecksumSigner {
    fn member(&self) -> PeerId {
        PeerId(*self.keypair.public_key().as_bytes())
    }

    fn sign(&self, message: &[u8]) -> Vec<u8> {
        self.keypair.sign(message).to_vec()
    }
}

/// Verifies against the public key embedded in the member id.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ed25519VouchVerifier;

impl VouchVerifier for Ed25519VouchVerifier {
    fn verify(&self, member: &PeerId, message: &[u8], signature: &[u8]) -> bool {
        let checked = Ed25519PublicKey::from_bytes(member.0).and_then(|key| {
            let signature = Ed25519Signature::from_slice(signature)?;
            key.verify(message, &signature)
        });
        if let Err(e) = &checked {
            debug!(member = %member.short(), error = %e, "[ml-05] Signature rejected");
        }
        checked.is_ok()
    }
}
