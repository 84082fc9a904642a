//! Stable hostname hashing and weighted draws.
//!
//! The weighted policy perturbs node weights by a hostname-derived
//! factor so that two nodes with identical remaining capacity never
//! carry identical weights across independent scheduler processes.
//! The hash must therefore be stable across builds and releases:
//! FNV-1a (64-bit) over the UTF-8 hostname bytes, folded into `[0, 1)`.
//! Changing the hash family shifts tie-break distributions and needs a
//! migration note.

use rand::Rng;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// FNV-1a over the hostname bytes.
fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET;
    for b in bytes {
        hash ^= u64::from(*b);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Map a hostname onto `[0, 1)`, uniformly and deterministically.
///
/// The top 53 bits of the hash fill an f64 mantissa exactly, so every
/// hostname maps to a distinct representable value below 1.0.
pub fn hostname_unit(hostname: &str) -> f64 {
    (fnv1a(hostname.as_bytes()) >> 11) as f64 / (1u64 << 53) as f64
}

/// Draw an index with probability proportional to its weight.
///
/// Returns `None` when the weights sum to zero (nothing selectable).
pub(crate) fn weighted_pick<R: Rng>(weights: &[f64], rng: &mut R) -> Option<usize> {
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return None;
    }

    let draw = rng.random_range(0.0..total);
    let mut cumulative = 0.0;
    for (idx, w) in weights.iter().enumerate() {
        cumulative += w;
        if draw < cumulative {
            return Some(idx);
        }
    }
    // Float round-off can leave the draw a hair past the last bucket.
    Some(weights.len() - 1)
}
