// Window hashing and forward match extension.
//
//   - **Window checksum**: 4-byte window read little-endian and multiplied
//     by an LCG constant. Used for both source and target indexing.
//   - **Forward match**: length of the common prefix of two slices,
//     compared eight bytes at a time.

use super::config::MIN_MATCH;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// LCG multiplier for 32-bit hashes.
pub const HASH_MULT_32: u32 = 1_597_334_677;

/// Offset added to stored positions so 0 means "empty bucket".
pub const HASH_CKOFFSET: u32 = 1;

// ---------------------------------------------------------------------------
// Window checksum
// ---------------------------------------------------------------------------

/// Checksum of the [`MIN_MATCH`] bytes at the start of `base`.
#[inline(always)]
pub fn window_cksum(base: &[u8]) -> u32 {
    debug_assert!(base.len() >= MIN_MATCH);
    let word = u32::from_le_bytes([base[0], base[1], base[2], base[3]]);
    word.wrapping_mul(HASH_MULT_32)
}

// ---------------------------------------------------------------------------
// Hash table configuration
// ---------------------------------------------------------------------------

/// Hash table geometry.
#[derive(Clone, Debug)]
pub struct HashCfg {
    /// Number of buckets (power of 2).
    pub size: usize,
    /// Bit shift: `32 - log2(size)`.
    pub shift: u32,
}

impl HashCfg {
    /// Create a hash config for roughly `slots` entries.
    pub fn new(slots: usize) -> Self {
        let bits = size_hashtable_bits(slots);
        Self {
            size: 1usize << bits,
            shift: 32 - bits,
        }
    }

    /// Bucket index from a checksum. The multiplicative hash mixes best
    /// into its high bits, so those select the bucket.
    #[inline(always)]
    pub fn bucket(&self, cksum: u32) -> usize {
        (cksum >> self.shift) as usize
    }
}

/// Bit width for a table holding about `slots` entries, between 4 and 24.
fn size_hashtable_bits(slots: usize) -> u32 {
    const MIN_BITS: u32 = 4;
    const MAX_BITS: u32 = 24;
    let wanted = slots.max(1).next_power_of_two().trailing_zeros();
    wanted.clamp(MIN_BITS, MAX_BITS)
}

// ---------------------------------------------------------------------------
// Forward match
// ---------------------------------------------------------------------------

/// Compare `s1[..n]` and `s2[..n]`, return number of matching bytes from
/// the start. `n` is clamped to both lengths.
#[inline]
pub fn forward_match(s1: &[u8], s2: &[u8], n: usize) -> usize {
    let n = n.min(s1.len()).min(s2.len());
    let (a, b) = (&s1[..n], &s2[..n]);

    let mut i = 0;
    for (ca, cb) in a.chunks_exact(8).zip(b.chunks_exact(8)) {
        let wa = u64::from_le_bytes(ca.try_into().unwrap_or_default());
        let wb = u64::from_le_bytes(cb.try_into().unwrap_or_default());
        let diff = wa ^ wb;
        if diff != 0 {
            return i + (diff.trailing_zeros() / 8) as usize;
        }
        i += 8;
    }
    while i < n && a[i] == b[i] {
        i += 1;
    }
    i
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
