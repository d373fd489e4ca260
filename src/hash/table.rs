// Chained hash table for match candidates.
//
// One `head` slot per bucket plus one `prev` link per indexed position,
// so every inserted position stays reachable (newest first). Used for
// both the original buffer (filled up front) and the modified buffer
// (filled as the scan passes each position).
//
// Stored values carry HASH_CKOFFSET=1 so that 0 means "empty".

use super::rolling::{HASH_CKOFFSET, HashCfg};

/// Hash table with full per-position chaining.
pub struct ChainTable {
    /// Bucket array: `head[bucket] = pos + HASH_CKOFFSET` or 0 (empty).
    head: Vec<u32>,
    /// `prev[pos]` = previous entry of the same bucket, same encoding.
    prev: Vec<u32>,
    cfg: HashCfg,
}

impl ChainTable {
    /// Create a table able to index positions `0..positions`.
    ///
    /// Positions that do not fit in `u32` are ignored by [`insert`](Self::insert).
    pub fn new(positions: usize) -> Self {
        let cfg = HashCfg::new(positions);
        let capacity = positions.min(u32::MAX as usize - 1);
        Self {
            head: vec![0u32; cfg.size],
            prev: vec![0u32; capacity],
            cfg,
        }
    }

    /// Insert `pos` under `cksum`. Each position must be inserted at most
    /// once; re-inserting would link a position to itself.
    #[inline]
    pub fn insert(&mut self, cksum: u32, pos: usize) {
        if pos >= self.prev.len() {
            return;
        }
        let bucket = self.cfg.bucket(cksum);
        self.prev[pos] = self.head[bucket];
        self.head[bucket] = pos as u32 + HASH_CKOFFSET;
    }

    /// Most recently inserted position for `cksum`.
    #[inline]
    pub fn lookup(&self, cksum: u32) -> Option<usize> {
        decode_slot(self.head[self.cfg.bucket(cksum)])
    }

    /// Entry inserted before `pos` in the same bucket.
    #[inline]
    pub fn chain_prev(&self, pos: usize) -> Option<usize> {
        self.prev.get(pos).copied().and_then(decode_slot)
    }

    /// Walk at most `limit` candidates for `cksum`, newest first.
    pub fn candidates(&self, cksum: u32, limit: usize) -> Candidates<'_> {
        Candidates {
            table: self,
            next: self.lookup(cksum),
            left: limit,
        }
    }

    /// Bucket count.
    pub fn size(&self) -> usize {
        self.cfg.size
    }

    /// Heap bytes held by the table.
    pub fn memory_usage(&self) -> usize {
        (self.head.len() + self.prev.len()) * std::mem::size_of::<u32>()
    }

    /// Heap bytes a table for `positions` entries would hold.
    pub fn estimate_memory(positions: usize) -> usize {
        let prev = positions.min(u32::MAX as usize - 1);
        (HashCfg::new(positions).size + prev) * std::mem::size_of::<u32>()
    }
}

#[inline]
fn decode_slot(val: u32) -> Option<usize> {
    (val != 0).then(|| (val - HASH_CKOFFSET) as usize)
}

/// Iterator over one bucket's chain. Buckets are shared by different
/// checksums, so callers still verify each candidate's bytes.
pub struct Candidates<'t> {
    table: &'t ChainTable,
    next: Option<usize>,
    left: usize,
}

impl Iterator for Candidates<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.left == 0 {
            return None;
        }
        let pos = self.next?;
        self.left -= 1;
        self.next = self.table.chain_prev(pos);
        Some(pos)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
