// CRC-32 (IEEE 802.3, reflected, polynomial 0xEDB88320).
//
// Used three times per patch: over the original, over the modified
// buffer, and over the patch bytes preceding the final checksum field.

/// Incremental CRC-32 state.
pub use crc32fast::Hasher as Crc32;

/// CRC-32 of a complete byte range.
#[inline]
pub fn crc32(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_vectors() {
        assert_eq!(crc32(b""), 0);
        assert_eq!(crc32(b"123456789"), 0xCBF4_3926);
        assert_eq!(
            crc32(b"The quick brown fox jumps over the lazy dog"),
            0x414F_A339
        );
    }

    #[test]
    fn incremental_matches_one_shot() {
        let data: Vec<u8> = (0..=255u8).cycle().take(5000).collect();
        let mut h = Crc32::new();
        for chunk in data.chunks(777) {
            h.update(chunk);
        }
        assert_eq!(h.finalize(), crc32(&data));
    }
}
