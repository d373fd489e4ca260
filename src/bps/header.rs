// Patch framing: leading header and trailing checksum footer.
//
//   magic(4) . sourceSize . targetSize . metadataSize . metadata
//   ... actions ...
//   sourceCRC32 . targetCRC32 . patchCRC32   (u32 little-endian each)

use super::decoder::DecodeError;
use super::varint;

// ---------------------------------------------------------------------------
// Magic and sizes
// ---------------------------------------------------------------------------

pub const PATCH_MAGIC: [u8; 4] = *b"BPS1";

/// Length of the checksum footer.
pub const FOOTER_LEN: usize = 12;

/// Smallest possible patch: magic, three one-byte varints, footer.
pub const MIN_PATCH_LEN: usize = PATCH_MAGIC.len() + 3 + FOOTER_LEN;

// ---------------------------------------------------------------------------
// Header
// ---------------------------------------------------------------------------

/// Parsed patch header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchHeader {
    /// Length of the original the patch was created against.
    pub source_size: u64,
    /// Length of the reconstructed output.
    pub target_size: u64,
    /// Opaque application payload carried through unchanged.
    pub metadata: Vec<u8>,
}

impl PatchHeader {
    /// Append the header (including magic) to `out`.
    pub fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&PATCH_MAGIC);
        varint::push_u64(out, self.source_size);
        varint::push_u64(out, self.target_size);
        varint::push_u64(out, self.metadata.len() as u64);
        out.extend_from_slice(&self.metadata);
    }

    /// Bytes the header occupies on the wire.
    pub fn encoded_len(&self) -> usize {
        PATCH_MAGIC.len()
            + varint::encoded_len(self.source_size)
            + varint::encoded_len(self.target_size)
            + varint::encoded_len(self.metadata.len() as u64)
            + self.metadata.len()
    }

    /// Parse the header from the front of `body` (the patch without its
    /// footer). Returns the header and the number of bytes consumed.
    pub fn decode(body: &[u8]) -> Result<(Self, usize), DecodeError> {
        check_magic(body)?;
        let mut pos = PATCH_MAGIC.len();

        let source_size = read_field(body, &mut pos)?;
        let target_size = read_field(body, &mut pos)?;
        let metadata_size = read_field(body, &mut pos)?;

        let available = body.len() - pos;
        let metadata_len = usize::try_from(metadata_size)
            .ok()
            .filter(|&n| n <= available)
            .ok_or(DecodeError::MetadataOverrun {
                size: metadata_size,
                available,
            })?;
        let metadata = body[pos..pos + metadata_len].to_vec();
        pos += metadata_len;

        Ok((
            Self {
                source_size,
                target_size,
                metadata,
            },
            pos,
        ))
    }
}

/// Verify the 4-byte magic at the front of `data`.
pub fn check_magic(data: &[u8]) -> Result<(), DecodeError> {
    match data.get(..PATCH_MAGIC.len()) {
        Some(found) if found == PATCH_MAGIC => Ok(()),
        Some(found) => {
            let mut magic = [0u8; 4];
            magic.copy_from_slice(found);
            Err(DecodeError::BadMagic { found: magic })
        }
        None => Err(DecodeError::TooShort { len: data.len() }),
    }
}

fn read_field(data: &[u8], pos: &mut usize) -> Result<u64, DecodeError> {
    let (val, consumed) =
        varint::read_u64(&data[*pos..]).map_err(|kind| DecodeError::MalformedVarInt {
            offset: *pos,
            kind,
        })?;
    *pos += consumed;
    Ok(val)
}

// ---------------------------------------------------------------------------
// Footer
// ---------------------------------------------------------------------------

/// The three trailing checksums.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatchFooter {
    /// CRC-32 of the original buffer.
    pub source_crc: u32,
    /// CRC-32 of the modified buffer.
    pub target_crc: u32,
    /// CRC-32 of every patch byte before this field.
    pub patch_crc: u32,
}

impl PatchFooter {
    /// Read the footer from the last [`FOOTER_LEN`] bytes of `patch`.
    pub fn decode(patch: &[u8]) -> Result<Self, DecodeError> {
        if patch.len() < MIN_PATCH_LEN {
            return Err(DecodeError::TooShort { len: patch.len() });
        }
        let tail = &patch[patch.len() - FOOTER_LEN..];
        let word = |i: usize| u32::from_le_bytes([tail[i], tail[i + 1], tail[i + 2], tail[i + 3]]);
        Ok(Self {
            source_crc: word(0),
            target_crc: word(4),
            patch_crc: word(8),
        })
    }
}

/// Split a patch into its body (header + actions) and footer.
pub fn split_patch(patch: &[u8]) -> Result<(&[u8], PatchFooter), DecodeError> {
    let footer = PatchFooter::decode(patch)?;
    Ok((&patch[..patch.len() - FOOTER_LEN], footer))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
