#![no_main]
use libfuzzer_sys::fuzz_target;
use oxibps::engine::{self, ApplyStatus, CreateOptions};

fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }

    // First byte picks the level, second the split point.
    let level = u32::from(data[0] % 10);
    let payload = &data[2..];
    let split = if payload.is_empty() {
        0
    } else {
        data[1] as usize % (payload.len() + 1)
    };
    let (original, modified) = payload.split_at(split);

    let opts = CreateOptions {
        level,
        ..Default::default()
    };
    let patch = engine::create_with_options(original, modified, &opts);
    let applied = engine::apply(original, &patch);
    assert_eq!(applied.status, ApplyStatus::Success);
    assert_eq!(applied.target.as_deref(), Some(modified));
});
