// Match engine: turns (original, modified) into an action stream.
//
// Scans the modified buffer left to right. At each output position:
//   1. SourceRead at the same offset (no operand, cheapest)
//   2. Continuation of the SourceCopy / TargetCopy cursors (delta 0)
//   3. Hashed source candidates (chained table over the original)
//   4. Hashed target candidates (chained table over bytes already passed)
//   5. Optional one-step lazy check before committing to a short match
// Candidates are ranked by encoded-size gain; uncovered bytes become
// literal TargetRead runs.

use log::debug;

use super::config::{MIN_MATCH, MatcherConfig};
use super::rolling::{self, forward_match};
use super::table::ChainTable;
use crate::bps::action::{self, Action, ActionKind};
use crate::bps::varint;

// ---------------------------------------------------------------------------
// Match result
// ---------------------------------------------------------------------------

/// A candidate copy found by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match {
    /// SourceRead, SourceCopy or TargetCopy.
    pub kind: ActionKind,
    /// Start of the copied range: in the original for source kinds, in the
    /// modified buffer for TargetCopy.
    pub addr: usize,
    /// Bytes covered.
    pub length: usize,
    /// Encoded size of the action in the patch.
    pub cost: usize,
}

impl Match {
    /// Patch bytes saved compared to storing the range as literals.
    #[inline]
    pub fn gain(&self) -> isize {
        self.length as isize - self.cost as isize
    }
}

// ---------------------------------------------------------------------------
// Match engine
// ---------------------------------------------------------------------------

/// The delta match engine.
///
/// Indexes the original once; [`find_actions`](Self::find_actions) can then
/// be run against any modified buffer.
pub struct MatchEngine<'s> {
    config: MatcherConfig,
    source: &'s [u8],
    source_table: Option<ChainTable>,
}

impl<'s> MatchEngine<'s> {
    /// Create an engine with the given profile and index `source`
    /// (skipped for the linear profile).
    pub fn new(config: MatcherConfig, source: &'s [u8]) -> Self {
        let source_table = (!config.linear).then(|| index_source(source));
        Self {
            config,
            source,
            source_table,
        }
    }

    /// The active profile.
    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    /// Heap bytes held by the source index.
    pub fn memory_usage(&self) -> usize {
        self.source_table.as_ref().map_or(0, ChainTable::memory_usage)
    }

    /// Produce the action stream that rebuilds `target` from the source.
    ///
    /// The actions cover `target` exactly, in order.
    pub fn find_actions<'t>(&self, target: &'t [u8]) -> Vec<Action<'t>> {
        let mut scan = Scan::new(self, target);
        scan.run();

        if log::log_enabled!(log::Level::Debug) {
            let mut counts = [0usize; 4];
            for a in &scan.actions {
                counts[a.kind().tag() as usize] += 1;
            }
            debug!(
                "matcher ({}): {} actions (source_read={}, target_read={}, source_copy={}, target_copy={})",
                self.config.name,
                scan.actions.len(),
                counts[0],
                counts[1],
                counts[2],
                counts[3]
            );
        }
        scan.actions
    }
}

/// Index every window of the original. Later positions end up first in
/// their chains.
fn index_source(source: &[u8]) -> ChainTable {
    let mut table = ChainTable::new(source.len());
    if source.len() >= MIN_MATCH {
        for pos in 0..=source.len() - MIN_MATCH {
            table.insert(rolling::window_cksum(&source[pos..]), pos);
        }
    }
    table
}

// ---------------------------------------------------------------------------
// Scan state
// ---------------------------------------------------------------------------

struct Scan<'e, 's, 't> {
    engine: &'e MatchEngine<'s>,
    target: &'t [u8],
    /// Index over target positions already passed.
    target_table: Option<ChainTable>,
    /// Target positions `< indexed` are in `target_table`.
    indexed: usize,
    /// Decoder-side cursors, mirrored so deltas can be costed.
    source_cursor: usize,
    target_cursor: usize,
    /// Start of the pending literal run.
    literal_start: Option<usize>,
    actions: Vec<Action<'t>>,
}

impl<'e, 's, 't> Scan<'e, 's, 't> {
    fn new(engine: &'e MatchEngine<'s>, target: &'t [u8]) -> Self {
        let target_table = (!engine.config.linear).then(|| ChainTable::new(target.len()));
        Self {
            engine,
            target,
            target_table,
            indexed: 0,
            source_cursor: 0,
            target_cursor: 0,
            literal_start: None,
            actions: Vec::with_capacity((target.len() / 64).max(4)),
        }
    }

    fn run(&mut self) {
        let config = self.engine.config;
        let n = self.target.len();
        let mut pos = 0usize;

        while pos < n {
            self.index_until(pos);
            let Some(m) = self.best_at(pos) else {
                self.push_literal(pos);
                pos += 1;
                continue;
            };

            if config.lazy && m.length < config.long_enough && pos + 1 < n {
                self.index_until(pos + 1);
                if let Some(next) = self.best_at(pos + 1)
                    && next.gain() > m.gain() + 1
                {
                    self.push_literal(pos);
                    pos += 1;
                    continue;
                }
            }

            self.emit(pos, m);
            pos += m.length;
        }

        self.flush_literals(n);
    }

    /// Best acceptable match starting at `pos`, if any.
    fn best_at(&self, pos: usize) -> Option<Match> {
        let config = &self.engine.config;
        let source = self.engine.source;
        let target = self.target;
        let remaining = target.len() - pos;
        let mut best: Option<Match> = None;

        // --- 1. SourceRead ---
        if pos < source.len() {
            let len = forward_match(&source[pos..], &target[pos..], remaining);
            self.consider(&mut best, pos, ActionKind::SourceRead, pos, len);
        }

        if config.linear {
            return best;
        }

        // --- 2. Cursor continuation ---
        if self.source_cursor < source.len() {
            let len = forward_match(&source[self.source_cursor..], &target[pos..], remaining);
            self.consider(&mut best, pos, ActionKind::SourceCopy, self.source_cursor, len);
        }
        if self.target_cursor < pos {
            let len = forward_match(&target[self.target_cursor..], &target[pos..], remaining);
            self.consider(&mut best, pos, ActionKind::TargetCopy, self.target_cursor, len);
        }

        if remaining < MIN_MATCH || self.long_enough(&best) {
            return best;
        }
        let cksum = rolling::window_cksum(&target[pos..]);

        // --- 3. Source index ---
        if let Some(table) = &self.engine.source_table {
            for cand in table.candidates(cksum, config.chain) {
                if cand == pos || cand == self.source_cursor {
                    continue;
                }
                let len = forward_match(&source[cand..], &target[pos..], remaining);
                self.consider(&mut best, pos, ActionKind::SourceCopy, cand, len);
                if self.long_enough(&best) {
                    return best;
                }
            }
        }

        // --- 4. Target index ---
        if let Some(table) = &self.target_table {
            for cand in table.candidates(cksum, config.chain) {
                if cand == self.target_cursor {
                    continue;
                }
                let len = forward_match(&target[cand..], &target[pos..], remaining);
                self.consider(&mut best, pos, ActionKind::TargetCopy, cand, len);
                if self.long_enough(&best) {
                    break;
                }
            }
        }

        best
    }

    /// Replace `best` with the candidate when it is acceptable and saves
    /// strictly more bytes. Candidates are offered in tie-break order.
    fn consider(
        &self,
        best: &mut Option<Match>,
        pos: usize,
        kind: ActionKind,
        addr: usize,
        length: usize,
    ) {
        if length == 0 {
            return;
        }
        let cost = self.cost(kind, addr, length);
        let reaches_end = pos + length == self.target.len();
        let acceptable = (length >= self.engine.config.min_match && length > cost)
            || (reaches_end && length >= cost);
        if !acceptable {
            return;
        }
        let m = Match {
            kind,
            addr,
            length,
            cost,
        };
        if best.is_none_or(|b| m.gain() > b.gain()) {
            *best = Some(m);
        }
    }

    fn cost(&self, kind: ActionKind, addr: usize, length: usize) -> usize {
        let header = varint::encoded_len(action::header_value(kind, length as u64));
        match kind {
            ActionKind::SourceRead => header,
            ActionKind::TargetRead => header + length,
            ActionKind::SourceCopy => header + varint::offset_len(delta(self.source_cursor, addr)),
            ActionKind::TargetCopy => header + varint::offset_len(delta(self.target_cursor, addr)),
        }
    }

    #[inline]
    fn long_enough(&self, best: &Option<Match>) -> bool {
        best.is_some_and(|b| b.length >= self.engine.config.long_enough)
    }

    /// Index target windows starting before `end`.
    fn index_until(&mut self, end: usize) {
        let target = self.target;
        let Some(table) = self.target_table.as_mut() else {
            return;
        };
        let last = target.len().saturating_sub(MIN_MATCH - 1);
        let end = end.min(last);
        while self.indexed < end {
            table.insert(rolling::window_cksum(&target[self.indexed..]), self.indexed);
            self.indexed += 1;
        }
    }

    fn push_literal(&mut self, pos: usize) {
        self.literal_start.get_or_insert(pos);
    }

    fn flush_literals(&mut self, end: usize) {
        if let Some(start) = self.literal_start.take() {
            self.actions.push(Action::TargetRead {
                data: &self.target[start..end],
            });
        }
    }

    fn emit(&mut self, pos: usize, m: Match) {
        self.flush_literals(pos);
        let len = m.length as u64;
        let action = match m.kind {
            ActionKind::SourceRead => Action::SourceRead { len },
            ActionKind::SourceCopy => {
                let delta = delta(self.source_cursor, m.addr);
                self.source_cursor = m.addr + m.length;
                Action::SourceCopy { len, delta }
            }
            ActionKind::TargetCopy => {
                let delta = delta(self.target_cursor, m.addr);
                self.target_cursor = m.addr + m.length;
                Action::TargetCopy { len, delta }
            }
            ActionKind::TargetRead => unreachable!("literals are never matches"),
        };
        self.actions.push(action);
    }
}

#[inline]
fn delta(cursor: usize, addr: usize) -> i64 {
    addr as i64 - cursor as i64
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bps::decoder::{ActionReader, reconstruct};
    use crate::hash::config::{self, DEFAULT, LINEAR, SLOW};

    fn replay(source: &[u8], actions: &[Action<'_>], target_len: usize) -> Vec<u8> {
        let mut bytes = Vec::new();
        for a in actions {
            a.write_to(&mut bytes);
        }
        let mut reader = ActionReader::new(&bytes, 0);
        reconstruct(&mut reader, source, source.len() as u64, target_len as u64).unwrap()
    }

    fn roundtrip<'t>(config: MatcherConfig, source: &[u8], target: &'t [u8]) -> Vec<Action<'t>> {
        let engine = MatchEngine::new(config, source);
        let actions = engine.find_actions(target);
        let covered: u64 = actions.iter().map(Action::len).sum();
        assert_eq!(covered, target.len() as u64, "actions must cover the target");
        assert!(actions.iter().all(|a| !a.is_empty()));
        assert_eq!(replay(source, &actions, target.len()), target);
        actions
    }

    fn lcg_bytes(n: usize, seed: u64) -> Vec<u8> {
        let mut s = seed;
        (0..n)
            .map(|_| {
                s = s.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                (s >> 33) as u8
            })
            .collect()
    }

    #[test]
    fn identical_is_one_source_read() {
        let data = b"The quick brown fox jumps over the lazy dog.";
        for level in 0..=9 {
            let actions = roundtrip(config::config_for_level(level), data, data);
            assert_eq!(actions, vec![Action::SourceRead { len: data.len() as u64 }]);
        }
    }

    #[test]
    fn tiny_identical_inputs_use_source_read() {
        for data in [&b"a"[..], b"ab", b"abc"] {
            let actions = roundtrip(DEFAULT, data, data);
            assert_eq!(actions, vec![Action::SourceRead { len: data.len() as u64 }]);
        }
    }

    #[test]
    fn append_scenario() {
        for config in [LINEAR, DEFAULT, SLOW] {
            let actions = roundtrip(config, b"AAAA", b"AAAABBBB");
            assert_eq!(
                actions,
                vec![
                    Action::SourceRead { len: 4 },
                    Action::TargetRead { data: b"BBBB" },
                ],
                "profile {}",
                config.name
            );
        }
    }

    #[test]
    fn empty_inputs() {
        assert!(roundtrip(DEFAULT, b"", b"").is_empty());
        assert!(roundtrip(DEFAULT, b"something", b"").is_empty());
        let actions = roundtrip(DEFAULT, b"", b"xyz");
        assert_eq!(actions, vec![Action::TargetRead { data: b"xyz" }]);
    }

    #[test]
    fn literals_are_coalesced() {
        let target = lcg_bytes(300, 7);
        let actions = roundtrip(DEFAULT, b"", &target);
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].kind(), ActionKind::TargetRead);
    }

    #[test]
    fn runs_use_overlapping_target_copy() {
        let target = vec![0xAAu8; 1000];
        let actions = roundtrip(DEFAULT, b"", &target);
        assert_eq!(actions.len(), 2, "{actions:?}");
        assert_eq!(actions[0], Action::TargetRead { data: &[0xAA] });
        assert_eq!(actions[1], Action::TargetCopy { len: 999, delta: 0 });
    }

    #[test]
    fn moved_block_uses_source_copy() {
        let a = lcg_bytes(2000, 1);
        let b = lcg_bytes(2000, 2);
        let source = [a.as_slice(), b.as_slice()].concat();
        let target = [b.as_slice(), a.as_slice()].concat();
        let actions = roundtrip(DEFAULT, &source, &target);
        assert_eq!(
            actions,
            vec![
                Action::SourceCopy { len: 2000, delta: 2000 },
                Action::SourceCopy { len: 2000, delta: -4000 },
            ]
        );
    }

    #[test]
    fn insertion_keeps_cursor_continuation() {
        let source = lcg_bytes(4096, 3);
        let mut target = source[..1000].to_vec();
        target.extend_from_slice(b"INSERTED TEXT");
        target.extend_from_slice(&source[1000..]);
        let actions = roundtrip(DEFAULT, &source, &target);
        let literal: usize = actions
            .iter()
            .filter(|a| a.kind() == ActionKind::TargetRead)
            .map(|a| a.len() as usize)
            .sum();
        assert!(literal <= 13, "{actions:?}");
        assert!(actions.len() <= 4, "{actions:?}");
    }

    #[test]
    fn repeated_target_content_uses_target_copy() {
        let chunk = lcg_bytes(512, 9);
        let target = [chunk.as_slice(), b"--", chunk.as_slice()].concat();
        let actions = roundtrip(DEFAULT, b"", &target);
        assert!(
            actions
                .iter()
                .any(|a| matches!(a, Action::TargetCopy { len: 512, delta: 0 })),
            "{actions:?}"
        );
    }

    #[test]
    fn linear_profile_only_reads() {
        let source = lcg_bytes(1024, 4);
        let mut target = source.clone();
        target.rotate_left(100);
        let actions = roundtrip(LINEAR, &source, &target);
        assert!(actions.iter().all(|a| matches!(
            a.kind(),
            ActionKind::SourceRead | ActionKind::TargetRead
        )));
    }

    #[test]
    fn scattered_edits_all_levels() {
        let source = lcg_bytes(8192, 5);
        let mut target = source.clone();
        for i in (0..target.len()).step_by(97) {
            target[i] = target[i].wrapping_add(1);
        }
        target.truncate(7000);
        target.extend_from_slice(&source[100..900]);
        for level in 0..=9 {
            roundtrip(config::config_for_level(level), &source, &target);
        }
    }

    #[test]
    fn match_gain() {
        let m = Match {
            kind: ActionKind::SourceCopy,
            addr: 0,
            length: 10,
            cost: 3,
        };
        assert_eq!(m.gain(), 7);
    }
}
