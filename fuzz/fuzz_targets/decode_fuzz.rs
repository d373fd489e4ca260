#![no_main]
use libfuzzer_sys::fuzz_target;
use oxibps::engine::{self, ApplyOptions};

// Keeps allocations small for hostile size fields.
const LIMIT: u64 = 1 << 20;

fuzz_target!(|data: &[u8]| {
    // Apply and inspect must never panic, only report errors.
    let opts = ApplyOptions {
        max_target_size: LIMIT,
        ..Default::default()
    };
    let _ = engine::apply_with_options(&[], data, &opts);
    let _ = engine::inspect(data);

    // Also fuzz with a non-empty original.
    if data.len() >= 2 {
        let split = data.len() / 2;
        let (original, patch) = data.split_at(split);
        let applied = engine::apply_with_options(original, patch, &opts);
        if applied.status.is_error() {
            assert!(applied.target.is_none());
        }
    }
});
