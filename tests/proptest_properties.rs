use oxibps::bps::varint;
use oxibps::engine::{self, ApplyStatus, CreateOptions};
use proptest::prelude::*;

fn create(original: &[u8], modified: &[u8], level: u32) -> Vec<u8> {
    engine::create_with_options(
        original,
        modified,
        &CreateOptions {
            level,
            ..Default::default()
        },
    )
}

/// Modified buffer built from slices of the original plus noise, so the
/// matcher has something to find.
fn derived(original: &[u8], cuts: &[(usize, usize)], noise: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    for (i, &(a, b)) in cuts.iter().enumerate() {
        if !original.is_empty() {
            let start = a % original.len();
            let end = (start + b % 512).min(original.len());
            out.extend_from_slice(&original[start..end]);
        }
        out.extend_from_slice(&noise[..noise.len().min(i * 3)]);
    }
    out
}

proptest! {
    #[test]
    fn prop_create_apply_roundtrip(
        original in proptest::collection::vec(any::<u8>(), 0..4096),
        modified in proptest::collection::vec(any::<u8>(), 0..4096),
        level in 0u32..=9u32
    ) {
        let patch = create(&original, &modified, level);
        let applied = engine::apply(&original, &patch);
        prop_assert_eq!(applied.status, ApplyStatus::Success);
        prop_assert_eq!(applied.target, Some(modified));
    }

    #[test]
    fn prop_roundtrip_with_shared_content(
        original in proptest::collection::vec(any::<u8>(), 0..4096),
        cuts in proptest::collection::vec((any::<usize>(), any::<usize>()), 0..12),
        noise in proptest::collection::vec(any::<u8>(), 0..64),
        level in 0u32..=9u32
    ) {
        let modified = derived(&original, &cuts, &noise);
        let patch = create(&original, &modified, level);
        let applied = engine::apply(&original, &patch);
        prop_assert_eq!(applied.status, ApplyStatus::Success);
        prop_assert_eq!(applied.target, Some(modified));
    }

    #[test]
    fn prop_identity_is_one_source_read(
        data in proptest::collection::vec(any::<u8>(), 1..8192),
        level in 0u32..=9u32
    ) {
        let patch = create(&data, &data, level);
        let summary = engine::inspect(&patch).unwrap();
        prop_assert_eq!(summary.total_actions(), 1);
        prop_assert_eq!(summary.action_counts[0], 1);
        prop_assert!(patch.len() <= 19 + 3 * varint::MAX_VARINT_LEN);
    }

    #[test]
    fn prop_create_is_deterministic(
        original in proptest::collection::vec(any::<u8>(), 0..2048),
        modified in proptest::collection::vec(any::<u8>(), 0..2048),
        level in 0u32..=9u32
    ) {
        prop_assert_eq!(create(&original, &modified, level), create(&original, &modified, level));
    }

    #[test]
    fn prop_apply_never_panics(
        original in proptest::collection::vec(any::<u8>(), 0..256),
        patch in proptest::collection::vec(any::<u8>(), 0..512)
    ) {
        let applied = engine::apply(&original, &patch);
        if applied.status.is_error() {
            prop_assert!(applied.target.is_none());
        }
    }

    #[test]
    fn prop_corrupted_byte_never_succeeds(
        original in proptest::collection::vec(any::<u8>(), 0..1024),
        modified in proptest::collection::vec(any::<u8>(), 0..1024),
        at in any::<usize>(),
        flip in 1u8..=255u8
    ) {
        let mut patch = engine::create(&original, &modified);
        let i = at % patch.len();
        patch[i] ^= flip;
        let applied = engine::apply(&original, &patch);
        prop_assert!(!applied.status.is_success());
    }

    #[test]
    fn prop_varint_roundtrip_and_canonical(value in any::<u64>()) {
        let mut buf = Vec::new();
        varint::push_u64(&mut buf, value);
        prop_assert_eq!(buf.len(), varint::encoded_len(value));
        prop_assert_eq!(varint::read_u64(&buf), Ok((value, buf.len())));
        // Only the last byte is terminal and it is never a bare zero
        // continuation.
        prop_assert!(buf[..buf.len() - 1].iter().all(|b| b & 0x80 != 0));
        prop_assert!(buf.len() == 1 || *buf.last().unwrap() != 0);
    }

    #[test]
    fn prop_offset_roundtrip(delta in -(1i64 << 62)..(1i64 << 62)) {
        prop_assert_eq!(varint::decode_offset(varint::encode_offset(delta)), delta);
    }
}

#[test]
#[ignore = "performance properties are workload and machine dependent"]
fn perf_property_apply_not_pathological() {
    use std::time::Instant;
    let make = |n: usize| -> Vec<u8> { (0..n).map(|i| (i % 251) as u8).collect() };
    let original = make(4 * 1024 * 1024);
    let mut modified = original.clone();
    for i in (0..modified.len()).step_by(4096) {
        modified[i] = modified[i].wrapping_add(3);
    }

    let patch = engine::create(&original, &modified);
    let t0 = Instant::now();
    let applied = engine::apply(&original, &patch);
    let dt = t0.elapsed();
    assert!(applied.status.is_success());
    assert!(dt.as_secs_f64() < 2.0, "apply took {dt:?}");
}
