//! # Council Selection
//!
//! Every peer derives the same council for an epoch without talking to
//! anyone:
//!
//! 1. seed = SHA-256("ml-council-seed-v1" || epochId || previousHeadHash?)
//! 2. sort and dedupe the known peer set (local peer included)
//! 3. Fisher-Yates shuffle driven by the seed, keep the first `size`
//!
//! The seed is the chain link of the epoch being authenticated, so nobody
//! learns a future council before the epoch it depends on is finalized.

use shared_crypto::Sha256Hasher;
use shared_types::{EpochId, Hash, PeerId};
use std::collections::BTreeSet;

const SEED_DOMAIN: &[u8] = b"ml-council-seed-v1";
const STEP_DOMAIN: &[u8] = b"ml-council-step-v1";

/// Seed for an epoch's council.
pub fn council_seed(previous_head_hash: Option<&Hash>, epoch_id: &EpochId) -> Hash {
    let mut hasher = Sha256Hasher::with_domain(SEED_DOMAIN);
    hasher.update_framed(epoch_id.to_string().as_bytes());
    match previous_head_hash {
        Some(prev) => {
            hasher.update(&[1]).update(prev);
        }
        None => {
            hasher.update(&[0]);
        }
    }
    hasher.finalize()
}

fn next_state(state: &Hash, index: u64) -> Hash {
    let mut hasher = Sha256Hasher::with_domain(STEP_DOMAIN);
    hasher.update(state).update_u64(index);
    hasher.finalize()
}

/// Seeded Fisher-Yates shuffle.
pub fn shuffle_with_seed<T: Clone>(items: &[T], seed: &Hash) -> Vec<T> {
    let mut result = items.to_vec();
    let len = result.len();
    if len <= 1 {
        return result;
    }

    let mut state = *seed;
    for i in (1..len).rev() {
        state = next_state(&state, i as u64);
        let mut word = [0u8; 8];
        word.copy_from_slice(&state[..8]);
        let j = (u64::from_le_bytes(word) % (i as u64 + 1)) as usize;
        result.swap(i, j);
    }
    result
}

/// Council for `epoch_id`, in selection order.
///
/// Returns every peer when `size` covers the whole set.
pub fn select_council(
    previous_head_hash: Option<&Hash>,
    epoch_id: &EpochId,
    peers: &[PeerId],
    size: usize,
) -> Vec<PeerId> {
    let candidates: Vec<PeerId> = peers.iter().copied().collect::<BTreeSet<_>>().into_iter().collect();
    let seed = council_seed(previous_head_hash, epoch_id);
    let mut council = shuffle_with_seed(&candidates, &seed);
    council.truncate(size);
    council
}
