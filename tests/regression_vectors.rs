use oxibps::bps::{DecodeError, decode_memory};
use oxibps::engine::{self, ApplyStatus, CreateOptions};

/// A patch with known bytes. CRCs were computed independently with zlib.
struct Vector {
    name: &'static str,
    original: &'static [u8],
    modified: &'static [u8],
    metadata: &'static [u8],
    patch: &'static [u8],
    /// Whether `create` at the default level emits exactly these bytes.
    canonical: bool,
}

const VECTORS: &[Vector] = &[
    Vector {
        name: "append",
        original: b"AAAA",
        modified: b"AAAABBBB",
        metadata: b"",
        patch: &[
            0x42, 0x50, 0x53, 0x31, 0x04, 0x08, 0x00, 0x0C, 0x0D, 0x42, 0x42, 0x42, 0x42, 0xF1,
            0x08, 0x0D, 0x9B, 0xC4, 0x0F, 0x60, 0xDB, 0x03, 0xBC, 0xC8, 0x2C,
        ],
        canonical: true,
    },
    Vector {
        name: "empty",
        original: b"",
        modified: b"",
        metadata: b"",
        patch: &[
            0x42, 0x50, 0x53, 0x31, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x42, 0x23, 0x69, 0xA9,
        ],
        canonical: true,
    },
    Vector {
        name: "identity",
        original: b"hello world",
        modified: b"hello world",
        metadata: b"",
        patch: &[
            0x42, 0x50, 0x53, 0x31, 0x0B, 0x0B, 0x00, 0x28, 0x85, 0x11, 0x4A, 0x0D, 0x85, 0x11,
            0x4A, 0x0D, 0xE0, 0x00, 0x86, 0x1E,
        ],
        canonical: true,
    },
    Vector {
        name: "run",
        original: b"",
        modified: &[0xAA; 1000],
        metadata: b"",
        patch: &[
            0x42, 0x50, 0x53, 0x31, 0x00, 0xE8, 0x07, 0x00, 0x01, 0xAA, 0x9B, 0x1F, 0x00, 0x00,
            0x00, 0x00, 0x00, 0xA0, 0x2E, 0x9B, 0xBD, 0xD6, 0xB6, 0x03, 0x53,
        ],
        canonical: true,
    },
    Vector {
        name: "metadata",
        original: b"abc",
        modified: b"abc",
        metadata: b"v1.1",
        patch: &[
            0x42, 0x50, 0x53, 0x31, 0x03, 0x03, 0x04, 0x76, 0x31, 0x2E, 0x31, 0x08, 0xC2, 0x41,
            0x24, 0x35, 0xC2, 0x41, 0x24, 0x35, 0x28, 0xC6, 0x96, 0x17,
        ],
        canonical: true,
    },
    // SourceCopy forward, SourceCopy backward, overlapping TargetCopy.
    Vector {
        name: "cursor_copies",
        original: b"abcdef",
        modified: b"defabcefab",
        metadata: b"",
        patch: &[
            0x42, 0x50, 0x53, 0x31, 0x06, 0x0A, 0x00, 0x0A, 0x06, 0x0A, 0x0D, 0x0F, 0x02, 0xEF,
            0x39, 0x8E, 0x4B, 0x07, 0xAF, 0x61, 0x12, 0x8F, 0x9D, 0x81, 0x96,
        ],
        canonical: false,
    },
];

#[test]
fn vectors_decode() {
    for v in VECTORS {
        let applied = engine::apply(v.original, v.patch);
        assert_eq!(applied.status, ApplyStatus::Success, "vector {}", v.name);
        assert_eq!(applied.target.as_deref(), Some(v.modified), "vector {}", v.name);
        assert_eq!(applied.metadata, v.metadata, "vector {}", v.name);
    }
}

#[test]
fn canonical_vectors_encode_byte_exact() {
    for v in VECTORS.iter().filter(|v| v.canonical) {
        let opts = CreateOptions {
            metadata: v.metadata.to_vec(),
            ..Default::default()
        };
        let patch = engine::create_with_options(v.original, v.modified, &opts);
        assert_eq!(patch, v.patch, "vector {}", v.name);
    }
}

#[test]
fn vector_checksums_match_footer() {
    for v in VECTORS {
        let decoded = decode_memory(v.patch, v.original, u64::MAX).unwrap();
        assert_eq!(decoded.footer.source_crc, decoded.source_crc, "vector {}", v.name);
        assert_eq!(decoded.footer.target_crc, decoded.target_crc, "vector {}", v.name);
        assert_eq!(decoded.footer.patch_crc, decoded.patch_crc, "vector {}", v.name);
    }
}

#[test]
fn every_truncation_of_a_vector_fails() {
    for v in VECTORS {
        for cut in 0..v.patch.len() {
            let applied = engine::apply(v.original, &v.patch[..cut]);
            assert!(
                applied.status.is_error(),
                "vector {} cut at {cut} decoded as {:?}",
                v.name,
                applied.status
            );
            assert!(applied.target.is_none());
        }
    }
}

#[test]
fn every_single_bit_flip_is_detected() {
    for v in VECTORS {
        for byte in 0..v.patch.len() {
            for bit in 0..8 {
                let mut bad = v.patch.to_vec();
                bad[byte] ^= 1 << bit;
                let applied = engine::apply(v.original, &bad);
                assert!(
                    !applied.status.is_success(),
                    "vector {} flip {byte}:{bit} went unnoticed",
                    v.name
                );
                if byte >= 4 {
                    assert!(
                        matches!(
                            applied.status,
                            ApplyStatus::Error(DecodeError::PatchSelfChecksumMismatch { .. })
                        ),
                        "vector {} flip {byte}:{bit}: {:?}",
                        v.name,
                        applied.status
                    );
                }
            }
        }
    }
}
