// Variable-length integer encoding for the patch format.
//
// Base-128, little-endian: least-significant group first.
// Each byte has bit 7 set except the final byte.
// Copy offsets are stored as a magnitude with the sign in bit 0.

/// Maximum encoded length for a 64-bit value (ceil(64/7) = 10).
pub const MAX_VARINT_LEN: usize = 10;

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Encode a `u64` into `buf`, returning the number of bytes used (1..=10).
///
/// The encoding is canonical: the last byte always carries a non-zero
/// group unless the value itself is zero.
#[inline]
pub fn encode_u64(mut num: u64, buf: &mut [u8; MAX_VARINT_LEN]) -> usize {
    let mut i = 0;
    loop {
        let group = (num & 0x7F) as u8;
        num >>= 7;
        if num == 0 {
            buf[i] = group;
            return i + 1;
        }
        buf[i] = group | 0x80;
        i += 1;
    }
}

/// Append the encoding of `num` to `out`.
#[inline]
pub fn push_u64(out: &mut Vec<u8>, num: u64) {
    let mut buf = [0u8; MAX_VARINT_LEN];
    let len = encode_u64(num, &mut buf);
    out.extend_from_slice(&buf[..len]);
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Decode a `u64` from the front of `data`.
/// Returns `(value, bytes_consumed)` or an error.
pub fn read_u64(data: &[u8]) -> Result<(u64, usize), VarIntError> {
    let mut val: u64 = 0;
    for (i, &byte) in data.iter().enumerate() {
        let group = u64::from(byte & 0x7F);
        let shift = 7 * i as u32;
        if shift >= 64 || (shift == 63 && group > 1) {
            return Err(VarIntError::Overflow);
        }
        val |= group << shift;
        if byte & 0x80 == 0 {
            if byte == 0 && i > 0 {
                return Err(VarIntError::NonCanonical);
            }
            return Ok((val, i + 1));
        }
    }
    Err(VarIntError::Truncated)
}

// ---------------------------------------------------------------------------
// Signed offsets
// ---------------------------------------------------------------------------

/// Map a signed cursor delta to its stored form: magnitude shifted left by
/// one, sign in the low bit (1 = negative).
#[inline]
pub fn encode_offset(delta: i64) -> u64 {
    (delta.unsigned_abs() << 1) | u64::from(delta < 0)
}

/// Inverse of [`encode_offset`].
#[inline]
pub fn decode_offset(stored: u64) -> i64 {
    let magnitude = (stored >> 1) as i64;
    if stored & 1 != 0 { -magnitude } else { magnitude }
}

/// Append a signed offset to `out`.
#[inline]
pub fn push_offset(out: &mut Vec<u8>, delta: i64) {
    push_u64(out, encode_offset(delta));
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Return the encoded byte-length of a `u64` value.
#[inline]
pub fn encoded_len(num: u64) -> usize {
    let bits = 64 - num.leading_zeros();
    bits.max(1).div_ceil(7) as usize
}

/// Return the encoded byte-length of a signed offset.
#[inline]
pub fn offset_len(delta: i64) -> usize {
    encoded_len(encode_offset(delta))
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum VarIntError {
    /// Input ended before a terminal byte.
    #[error("varint truncated (no terminal byte)")]
    Truncated,
    /// Value does not fit in 64 bits.
    #[error("varint overflow")]
    Overflow,
    /// Redundant trailing zero group.
    #[error("varint is not canonically encoded")]
    NonCanonical,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
