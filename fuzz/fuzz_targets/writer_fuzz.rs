#![no_main]
use libfuzzer_sys::fuzz_target;
use oxibps::bps::{Action, PatchHeader, PatchWriter, checksum};
use oxibps::engine::{self, ApplyStatus};

// Interprets the input as a script of actions, writes them with
// PatchWriter, then checks the reader sees the same stream and that
// apply either succeeds or fails cleanly.
fuzz_target!(|data: &[u8]| {
    if data.len() < 4 {
        return;
    }
    let (original, script) = data.split_at(data.len() / 3);

    let mut actions = Vec::new();
    let mut produced = 0u64;
    let mut i = 0;
    while i + 2 <= script.len() && actions.len() < 64 {
        let len = u64::from(script[i + 1] % 16) + 1;
        let action = match script[i] % 4 {
            0 => Action::SourceRead { len },
            1 => {
                let end = (i + 2 + len as usize).min(script.len());
                let lit = &script[i + 2..end];
                if lit.is_empty() {
                    break;
                }
                i += lit.len();
                Action::TargetRead { data: lit }
            }
            2 => Action::SourceCopy {
                len,
                delta: i64::from(script[i] as i8),
            },
            _ => Action::TargetCopy {
                len,
                delta: i64::from(script[i + 1] as i8),
            },
        };
        produced += action.len();
        actions.push(action);
        i += 2;
    }

    let header = PatchHeader {
        source_size: original.len() as u64,
        target_size: produced,
        metadata: Vec::new(),
    };
    let mut writer = PatchWriter::new(&header);
    for a in &actions {
        writer.push(*a);
    }
    let patch = writer.finish(checksum::crc32(original), 0);

    let (_, _, reader) = engine::open_actions(&patch).unwrap();
    let parsed: Vec<Action<'_>> = reader.map(Result::unwrap).collect();
    assert_eq!(parsed, actions);

    let applied = engine::apply(original, &patch);
    match applied.status {
        ApplyStatus::Error(_) => assert!(applied.target.is_none()),
        _ => assert_eq!(applied.target.map(|t| t.len() as u64), Some(produced)),
    }
});
