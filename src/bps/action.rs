// Action vocabulary of the patch stream.
//
// Every action starts with one varint header `(len - 1) << 2 | tag`.
// Copy actions are followed by a signed cursor delta, TargetRead by its
// literal bytes.

use std::fmt;

use super::varint;

/// Header tag values (low two bits of the action header).
pub const TAG_SOURCE_READ: u8 = 0;
pub const TAG_TARGET_READ: u8 = 1;
pub const TAG_SOURCE_COPY: u8 = 2;
pub const TAG_TARGET_COPY: u8 = 3;

/// The four action kinds, without operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    SourceRead,
    TargetRead,
    SourceCopy,
    TargetCopy,
}

impl ActionKind {
    pub const ALL: [ActionKind; 4] = [
        ActionKind::SourceRead,
        ActionKind::TargetRead,
        ActionKind::SourceCopy,
        ActionKind::TargetCopy,
    ];

    #[inline]
    pub fn tag(self) -> u8 {
        match self {
            Self::SourceRead => TAG_SOURCE_READ,
            Self::TargetRead => TAG_TARGET_READ,
            Self::SourceCopy => TAG_SOURCE_COPY,
            Self::TargetCopy => TAG_TARGET_COPY,
        }
    }

    /// Kind for the low two bits of a header. Every value is valid.
    #[inline]
    pub fn from_tag(tag: u8) -> Self {
        match tag & 0x03 {
            TAG_SOURCE_READ => Self::SourceRead,
            TAG_TARGET_READ => Self::TargetRead,
            TAG_SOURCE_COPY => Self::SourceCopy,
            _ => Self::TargetCopy,
        }
    }

    /// Whether the header is followed by a signed offset.
    #[inline]
    pub fn has_offset(self) -> bool {
        matches!(self, Self::SourceCopy | Self::TargetCopy)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::SourceRead => "SourceRead",
            Self::TargetRead => "TargetRead",
            Self::SourceCopy => "SourceCopy",
            Self::TargetCopy => "TargetCopy",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One command of the patch stream.
///
/// `TargetRead` borrows its literal bytes: from the modified buffer while
/// encoding, from the patch itself while decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action<'a> {
    /// Copy `len` bytes of the original at the current output offset.
    SourceRead { len: u64 },
    /// Append literal bytes.
    TargetRead { data: &'a [u8] },
    /// Move the source cursor by `delta`, then copy `len` bytes from it.
    SourceCopy { len: u64, delta: i64 },
    /// Move the target cursor by `delta`, then copy `len` already-written
    /// output bytes from it (the range may overlap the write position).
    TargetCopy { len: u64, delta: i64 },
}

impl Action<'_> {
    #[inline]
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::SourceRead { .. } => ActionKind::SourceRead,
            Self::TargetRead { .. } => ActionKind::TargetRead,
            Self::SourceCopy { .. } => ActionKind::SourceCopy,
            Self::TargetCopy { .. } => ActionKind::TargetCopy,
        }
    }

    /// Number of output bytes this action produces.
    #[inline]
    pub fn len(&self) -> u64 {
        match *self {
            Self::SourceRead { len } => len,
            Self::TargetRead { data } => data.len() as u64,
            Self::SourceCopy { len, .. } | Self::TargetCopy { len, .. } => len,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Signed cursor delta for copy actions.
    #[inline]
    pub fn delta(&self) -> Option<i64> {
        match *self {
            Self::SourceCopy { delta, .. } | Self::TargetCopy { delta, .. } => Some(delta),
            _ => None,
        }
    }

    /// Bytes this action occupies in the patch stream.
    #[inline]
    pub fn encoded_len(&self) -> usize {
        let header = varint::encoded_len(header_value(self.kind(), self.len()));
        match *self {
            Self::SourceRead { .. } => header,
            Self::TargetRead { data } => header + data.len(),
            Self::SourceCopy { delta, .. } | Self::TargetCopy { delta, .. } => {
                header + varint::offset_len(delta)
            }
        }
    }

    /// Append the wire form (header, offset, literal bytes) to `out`.
    ///
    /// Panics in debug builds on a zero-length action, which the format
    /// cannot represent.
    pub fn write_to(&self, out: &mut Vec<u8>) {
        debug_assert!(!self.is_empty(), "zero-length action");
        varint::push_u64(out, header_value(self.kind(), self.len()));
        match *self {
            Self::SourceRead { .. } => {}
            Self::TargetRead { data } => out.extend_from_slice(data),
            Self::SourceCopy { delta, .. } | Self::TargetCopy { delta, .. } => {
                varint::push_offset(out, delta);
            }
        }
    }
}

impl fmt::Display for Action<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.delta() {
            Some(delta) => write!(f, "{} len={} delta={delta:+}", self.kind(), self.len()),
            None => write!(f, "{} len={}", self.kind(), self.len()),
        }
    }
}

/// Header value for an action of `kind` producing `len >= 1` bytes.
#[inline]
pub fn header_value(kind: ActionKind, len: u64) -> u64 {
    ((len - 1) << 2) | u64::from(kind.tag())
}

/// Split a decoded header into kind and length.
#[inline]
pub fn split_header(value: u64) -> (ActionKind, u64) {
    (ActionKind::from_tag(value as u8), (value >> 2) + 1)
}
