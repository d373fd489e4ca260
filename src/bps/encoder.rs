// Patch writer: header emission, action serialisation and checksum footer.
//
// The writer is format-only; choosing actions is the matcher's job
// (see `crate::hash::matching`).

use log::debug;

use super::action::Action;
use super::checksum;
use super::header::PatchHeader;

/// Serialises one patch into memory.
///
/// # Example
/// ```
/// use oxibps::bps::{Action, PatchHeader, PatchWriter, checksum};
///
/// let header = PatchHeader { source_size: 3, target_size: 4, metadata: Vec::new() };
/// let mut w = PatchWriter::new(&header);
/// w.push(Action::SourceRead { len: 3 });
/// w.push(Action::TargetRead { data: b"!" });
/// let patch = w.finish(checksum::crc32(b"abc"), checksum::crc32(b"abc!"));
/// assert_eq!(&patch[..4], b"BPS1");
/// ```
pub struct PatchWriter {
    buf: Vec<u8>,
    target_size: u64,
    /// Output bytes covered by the actions pushed so far.
    produced: u64,
    actions: u64,
}

impl PatchWriter {
    /// Start a patch with the given header.
    pub fn new(header: &PatchHeader) -> Self {
        Self::with_capacity(header, 0)
    }

    /// Start a patch, reserving room for `capacity` bytes of actions.
    pub fn with_capacity(header: &PatchHeader, capacity: usize) -> Self {
        let mut buf = Vec::with_capacity(header.encoded_len() + capacity + 12);
        header.encode(&mut buf);
        Self {
            buf,
            target_size: header.target_size,
            produced: 0,
            actions: 0,
        }
    }

    /// Append one action.
    pub fn push(&mut self, action: Action<'_>) {
        action.write_to(&mut self.buf);
        self.produced += action.len();
        self.actions += 1;
    }

    /// Output bytes covered so far.
    pub fn produced(&self) -> u64 {
        self.produced
    }

    /// Number of actions pushed so far.
    pub fn action_count(&self) -> u64 {
        self.actions
    }

    /// Append the source and target checksums, then the checksum of
    /// everything before it, and return the finished patch.
    pub fn finish(mut self, source_crc: u32, target_crc: u32) -> Vec<u8> {
        debug_assert_eq!(
            self.produced, self.target_size,
            "actions do not cover the target"
        );
        self.buf.extend_from_slice(&source_crc.to_le_bytes());
        self.buf.extend_from_slice(&target_crc.to_le_bytes());
        let patch_crc = checksum::crc32(&self.buf);
        self.buf.extend_from_slice(&patch_crc.to_le_bytes());
        debug!(
            "patch finished: {} actions, {} bytes",
            self.actions,
            self.buf.len()
        );
        self.buf
    }
}
