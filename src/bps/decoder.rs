// Patch decoder: action parsing and target reconstruction.
//
// Follows the same progression as the encoder in reverse: split off the
// checksum footer, parse the header, then replay actions until exactly
// `target_size` bytes have been produced.
//
//   - Output Vec is pre-sized to target_size (bounded by a caller limit)
//   - SourceRead reads the original at the output offset
//   - SourceCopy/TargetCopy each keep their own cursor, moved by a signed
//     delta before use and advanced by the copy length after
//   - TargetCopy may overlap the write position (run-length style)

use log::{debug, trace};

use super::action::{self, Action, ActionKind};
use super::checksum;
use super::header::{self, PatchFooter, PatchHeader};
use super::varint::{self, VarIntError};

/// Largest target a patch may declare unless the caller raises the limit.
pub const DEFAULT_MAX_TARGET_SIZE: u64 = 1 << 30; // 1 GiB

// ---------------------------------------------------------------------------
// Decoder error
// ---------------------------------------------------------------------------

/// Fatal decode failures. None of them leaves a trustworthy output.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("patch is too short ({len} bytes)")]
    TooShort { len: usize },

    #[error("bad magic {found:02X?}, not a BPS1 patch")]
    BadMagic { found: [u8; 4] },

    #[error("malformed varint at patch offset {offset}: {kind}")]
    MalformedVarInt { offset: usize, kind: VarIntError },

    #[error("metadata size {size} exceeds the {available} bytes left in the patch")]
    MetadataOverrun { size: u64, available: usize },

    #[error("target size {size} exceeds the limit of {limit} bytes")]
    TargetTooLarge { size: u64, limit: u64 },

    #[error("{action} at output offset {output_offset} is out of range")]
    OutOfRange {
        action: ActionKind,
        output_offset: u64,
    },

    #[error("literal of {len} bytes at patch offset {offset} overruns the action stream ({available} bytes left)")]
    LiteralOverrun {
        offset: usize,
        len: u64,
        available: usize,
    },

    #[error("action stream ended after {produced} of {expected} target bytes")]
    Truncated { produced: u64, expected: u64 },

    #[error("{extra} trailing bytes after the last action")]
    TrailingData { extra: usize },

    #[error("patch checksum mismatch: expected {expected:#010X}, got {actual:#010X}")]
    PatchSelfChecksumMismatch { expected: u32, actual: u32 },
}

// ---------------------------------------------------------------------------
// Action reader
// ---------------------------------------------------------------------------

/// Decodes actions one at a time from the action region of a patch.
///
/// Literal bytes of `TargetRead` are borrowed from the patch.
pub struct ActionReader<'p> {
    data: &'p [u8],
    pos: usize,
    /// Patch offset of `data[0]`, for error reporting.
    base: usize,
}

impl<'p> ActionReader<'p> {
    /// Read actions from `data`, which starts at patch offset `base`.
    pub fn new(data: &'p [u8], base: usize) -> Self {
        Self { data, pos: 0, base }
    }

    /// Bytes not yet consumed.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Decode the next action, or `None` at the end of the region.
    pub fn next_action(&mut self) -> Result<Option<Action<'p>>, DecodeError> {
        if self.pos >= self.data.len() {
            return Ok(None);
        }

        let (kind, len) = action::split_header(self.read_varint()?);
        let action = match kind {
            ActionKind::SourceRead => Action::SourceRead { len },
            ActionKind::TargetRead => {
                let available = self.remaining();
                let n = usize::try_from(len)
                    .ok()
                    .filter(|&n| n <= available)
                    .ok_or(DecodeError::LiteralOverrun {
                        offset: self.base + self.pos,
                        len,
                        available,
                    })?;
                let data = &self.data[self.pos..self.pos + n];
                self.pos += n;
                Action::TargetRead { data }
            }
            ActionKind::SourceCopy => Action::SourceCopy {
                len,
                delta: varint::decode_offset(self.read_varint()?),
            },
            ActionKind::TargetCopy => Action::TargetCopy {
                len,
                delta: varint::decode_offset(self.read_varint()?),
            },
        };
        Ok(Some(action))
    }

    fn read_varint(&mut self) -> Result<u64, DecodeError> {
        let (val, consumed) =
            varint::read_u64(&self.data[self.pos..]).map_err(|kind| {
                DecodeError::MalformedVarInt {
                    offset: self.base + self.pos,
                    kind,
                }
            })?;
        self.pos += consumed;
        Ok(val)
    }
}

impl<'p> Iterator for ActionReader<'p> {
    type Item = Result<Action<'p>, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_action() {
            Ok(Some(action)) => Some(Ok(action)),
            Ok(None) => None,
            Err(e) => {
                // Stop after the first error.
                self.pos = self.data.len();
                Some(Err(e))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Reconstruction
// ---------------------------------------------------------------------------

/// Replay the actions in `reader` against `source`, producing exactly
/// `target_size` bytes.
///
/// `source_limit` bounds every source access; callers pass the smaller of
/// the declared source size and the supplied original's length.
pub fn reconstruct(
    reader: &mut ActionReader<'_>,
    source: &[u8],
    source_limit: u64,
    target_size: u64,
) -> Result<Vec<u8>, DecodeError> {
    let source_limit = source_limit.min(source.len() as u64);
    let mut output: Vec<u8> = Vec::with_capacity(target_size as usize);

    let mut source_cursor: u64 = 0;
    let mut target_cursor: u64 = 0;

    while (output.len() as u64) < target_size {
        let out_pos = output.len() as u64;
        let action = reader.next_action()?.ok_or(DecodeError::Truncated {
            produced: out_pos,
            expected: target_size,
        })?;
        trace!("output offset {out_pos}: {action}");

        let out_of_range = DecodeError::OutOfRange {
            action: action.kind(),
            output_offset: out_pos,
        };
        let len = action.len();
        if len > target_size - out_pos {
            return Err(out_of_range);
        }

        match action {
            Action::SourceRead { len } => {
                let end = out_pos + len;
                if end > source_limit {
                    return Err(out_of_range);
                }
                output.extend_from_slice(&source[out_pos as usize..end as usize]);
            }

            Action::TargetRead { data } => {
                output.extend_from_slice(data);
            }

            Action::SourceCopy { len, delta } => {
                let start = source_cursor
                    .checked_add_signed(delta)
                    .filter(|&s| s <= source_limit && len <= source_limit - s)
                    .ok_or(out_of_range)?;
                output.extend_from_slice(&source[start as usize..(start + len) as usize]);
                source_cursor = start + len;
            }

            Action::TargetCopy { len, delta } => {
                // The first byte must already be written; later bytes may
                // be produced by this very copy.
                let start = target_cursor
                    .checked_add_signed(delta)
                    .filter(|&s| s < out_pos)
                    .ok_or(out_of_range)?;
                let start_usize = start as usize;
                let len_usize = len as usize;
                if start_usize + len_usize <= output.len() {
                    // Fast path: non-overlapping.
                    output.extend_from_within(start_usize..start_usize + len_usize);
                } else {
                    // Overlapping: byte-by-byte so reads see bytes written
                    // earlier in the same action.
                    for i in 0..len_usize {
                        let byte = output[start_usize + i];
                        output.push(byte);
                    }
                }
                target_cursor = start + len;
            }
        }
    }

    if reader.remaining() > 0 {
        return Err(DecodeError::TrailingData {
            extra: reader.remaining(),
        });
    }

    Ok(output)
}

// ---------------------------------------------------------------------------
// Whole-patch decode
// ---------------------------------------------------------------------------

/// Result of a structurally successful decode. Checksums are reported,
/// not judged; classification happens in [`crate::engine`].
#[derive(Debug, Clone)]
pub struct DecodedPatch {
    pub header: PatchHeader,
    pub footer: PatchFooter,
    /// Reconstructed target bytes.
    pub target: Vec<u8>,
    /// CRC-32 of the original as supplied.
    pub source_crc: u32,
    /// CRC-32 of the reconstructed target.
    pub target_crc: u32,
    /// CRC-32 of the patch bytes before the self-checksum field.
    pub patch_crc: u32,
}

/// Decode a complete in-memory patch against `source`.
pub fn decode_memory(
    patch: &[u8],
    source: &[u8],
    max_target_size: u64,
) -> Result<DecodedPatch, DecodeError> {
    header::check_magic(patch)?;
    let (body, footer) = header::split_patch(patch)?;
    let (header, header_len) = PatchHeader::decode(body)?;

    debug!(
        "patch header: source_size={}, target_size={}, metadata={} bytes",
        header.source_size,
        header.target_size,
        header.metadata.len()
    );

    if header.target_size > max_target_size {
        return Err(DecodeError::TargetTooLarge {
            size: header.target_size,
            limit: max_target_size,
        });
    }
    if header.source_size != source.len() as u64 {
        log::warn!(
            "patch expects an original of {} bytes, got {}",
            header.source_size,
            source.len()
        );
    }

    let mut reader = ActionReader::new(&body[header_len..], header_len);
    let target = reconstruct(&mut reader, source, header.source_size, header.target_size)?;

    let source_crc = checksum::crc32(source);
    let target_crc = checksum::crc32(&target);
    let patch_crc = checksum::crc32(&patch[..patch.len() - 4]);

    Ok(DecodedPatch {
        header,
        footer,
        target,
        source_crc,
        target_crc,
        patch_crc,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bps::encoder::PatchWriter;

    fn actions_bytes(actions: &[Action<'_>]) -> Vec<u8> {
        let mut out = Vec::new();
        for a in actions {
            a.write_to(&mut out);
        }
        out
    }

    fn replay(source: &[u8], actions: &[Action<'_>], target_size: u64) -> Result<Vec<u8>, DecodeError> {
        let bytes = actions_bytes(actions);
        let mut reader = ActionReader::new(&bytes, 0);
        reconstruct(&mut reader, source, source.len() as u64, target_size)
    }

    #[test]
    fn reader_iterates_all_kinds() {
        let actions = [
            Action::SourceRead { len: 3 },
            Action::TargetRead { data: b"xyz" },
            Action::SourceCopy { len: 2, delta: -7 },
            Action::TargetCopy { len: 9, delta: 4 },
        ];
        let bytes = actions_bytes(&actions);
        let decoded: Vec<_> = ActionReader::new(&bytes, 0)
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(decoded, actions);
    }

    #[test]
    fn reader_stops_after_error() {
        let mut reader = ActionReader::new(&[0x80], 10);
        let first = reader.next().unwrap();
        assert!(matches!(
            first,
            Err(DecodeError::MalformedVarInt { offset: 10, kind: VarIntError::Truncated })
        ));
        assert!(reader.next().is_none());
    }

    #[test]
    fn literal_overrun() {
        // TargetRead of 4 bytes with only 2 present.
        let mut reader = ActionReader::new(&[0x0D, b'a', b'b'], 7);
        let err = reader.next_action().unwrap_err();
        assert_eq!(
            err,
            DecodeError::LiteralOverrun {
                offset: 8,
                len: 4,
                available: 2
            }
        );
    }

    #[test]
    fn source_read_follows_output_offset() {
        let out = replay(
            b"abcdef",
            &[
                Action::SourceRead { len: 2 },
                Action::TargetRead { data: b"XY" },
                Action::SourceRead { len: 2 },
            ],
            6,
        )
        .unwrap();
        assert_eq!(out, b"abXYef");
    }

    #[test]
    fn source_copy_cursor_tracking() {
        // Copy "def", then step back 6 from cursor 6 to 0 and copy "ab".
        let out = replay(
            b"abcdef",
            &[
                Action::SourceCopy { len: 3, delta: 3 },
                Action::SourceCopy { len: 2, delta: -6 },
            ],
            5,
        )
        .unwrap();
        assert_eq!(out, b"defab");
    }

    #[test]
    fn target_copy_overlap_runs() {
        let out = replay(
            b"",
            &[
                Action::TargetRead { data: b"ab" },
                Action::TargetCopy { len: 6, delta: 0 },
            ],
            8,
        )
        .unwrap();
        assert_eq!(out, b"abababab");
    }

    #[test]
    fn target_copy_must_start_before_cursor() {
        let err = replay(
            b"",
            &[
                Action::TargetRead { data: b"ab" },
                Action::TargetCopy { len: 1, delta: 2 },
            ],
            3,
        )
        .unwrap_err();
        assert_eq!(
            err,
            DecodeError::OutOfRange {
                action: ActionKind::TargetCopy,
                output_offset: 2
            }
        );
    }

    #[test]
    fn source_reads_are_bounded() {
        let err = replay(b"abc", &[Action::SourceRead { len: 4 }], 4).unwrap_err();
        assert!(matches!(err, DecodeError::OutOfRange { action: ActionKind::SourceRead, .. }));

        let err = replay(b"abc", &[Action::SourceCopy { len: 1, delta: -1 }], 1).unwrap_err();
        assert!(matches!(err, DecodeError::OutOfRange { action: ActionKind::SourceCopy, .. }));

        let err = replay(b"abc", &[Action::SourceCopy { len: 2, delta: 2 }], 2).unwrap_err();
        assert!(matches!(err, DecodeError::OutOfRange { action: ActionKind::SourceCopy, .. }));
    }

    #[test]
    fn action_overrunning_target_size() {
        let err = replay(b"abcdef", &[Action::SourceRead { len: 6 }], 4).unwrap_err();
        assert_eq!(
            err,
            DecodeError::OutOfRange {
                action: ActionKind::SourceRead,
                output_offset: 0
            }
        );
    }

    #[test]
    fn stream_ends_early() {
        let err = replay(b"abc", &[Action::SourceRead { len: 2 }], 3).unwrap_err();
        assert_eq!(
            err,
            DecodeError::Truncated {
                produced: 2,
                expected: 3
            }
        );
    }

    #[test]
    fn trailing_actions_rejected() {
        let err = replay(
            b"abc",
            &[Action::SourceRead { len: 3 }, Action::SourceRead { len: 1 }],
            3,
        )
        .unwrap_err();
        assert_eq!(err, DecodeError::TrailingData { extra: 1 });
    }

    #[test]
    fn decode_memory_reports_checksums() {
        let source = b"hello";
        let target = b"hello!";
        let mut w = PatchWriter::new(&PatchHeader {
            source_size: 5,
            target_size: 6,
            metadata: Vec::new(),
        });
        w.push(Action::SourceRead { len: 5 });
        w.push(Action::TargetRead { data: b"!" });
        let patch = w.finish(checksum::crc32(source), checksum::crc32(target));

        let decoded = decode_memory(&patch, source, DEFAULT_MAX_TARGET_SIZE).unwrap();
        assert_eq!(decoded.target, target);
        assert_eq!(decoded.source_crc, decoded.footer.source_crc);
        assert_eq!(decoded.target_crc, decoded.footer.target_crc);
        assert_eq!(decoded.patch_crc, decoded.footer.patch_crc);
    }

    #[test]
    fn decode_memory_enforces_target_limit() {
        let mut w = PatchWriter::new(&PatchHeader {
            source_size: 0,
            target_size: 100,
            metadata: Vec::new(),
        });
        w.push(Action::TargetRead { data: &[0u8; 100] });
        let patch = w.finish(0, 0);
        let err = decode_memory(&patch, b"", 99).unwrap_err();
        assert_eq!(err, DecodeError::TargetTooLarge { size: 100, limit: 99 });
    }
}
