// Patch engine: ties hash/matching to the BPS1 container.
//
// Provides the high-level APIs:
//   - create: match engine (hash module) -> action stream -> patch bytes
//   - apply: decode + replay, then classify the three checksums into
//     success / warning / error
//   - inspect: header, footer and action statistics without an original

use log::debug;

use crate::bps::checksum;
use crate::bps::decoder::{self, ActionReader, DEFAULT_MAX_TARGET_SIZE, DecodeError};
use crate::bps::encoder::PatchWriter;
use crate::bps::header::{self, PatchFooter, PatchHeader};
use crate::bps::{Action, ActionKind};
use crate::hash::config::{self, DEFAULT_LEVEL};
use crate::hash::matching::MatchEngine;
use crate::hash::table::ChainTable;

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Configuration for patch creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateOptions {
    /// Matcher level (0-9). Maps to matcher profiles.
    pub level: u32,
    /// Opaque bytes stored in the patch header.
    pub metadata: Vec<u8>,
}

impl Default for CreateOptions {
    fn default() -> Self {
        Self {
            level: DEFAULT_LEVEL,
            metadata: Vec::new(),
        }
    }
}

/// Configuration for patch application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyOptions {
    /// Return the decoded buffer even when the patch self-checksum fails.
    pub allow_unsafe: bool,
    /// Reject patches declaring a larger target.
    pub max_target_size: u64,
}

impl Default for ApplyOptions {
    fn default() -> Self {
        Self {
            allow_unsafe: false,
            max_target_size: DEFAULT_MAX_TARGET_SIZE,
        }
    }
}

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

/// Create a patch turning `original` into `modified` with default options.
pub fn create(original: &[u8], modified: &[u8]) -> Vec<u8> {
    create_with_options(original, modified, &CreateOptions::default())
}

/// Create a patch with custom options. Output is deterministic for fixed
/// inputs and options.
pub fn create_with_options(original: &[u8], modified: &[u8], opts: &CreateOptions) -> Vec<u8> {
    let profile = config::config_for_level(opts.level);
    let engine = MatchEngine::new(profile, original);
    let actions = engine.find_actions(modified);

    let header = PatchHeader {
        source_size: original.len() as u64,
        target_size: modified.len() as u64,
        metadata: opts.metadata.clone(),
    };
    let body: usize = actions.iter().map(Action::encoded_len).sum();
    let mut writer = PatchWriter::with_capacity(&header, body);
    for action in actions {
        writer.push(action);
    }
    let patch = writer.finish(checksum::crc32(original), checksum::crc32(modified));

    debug!(
        "created patch: level={} ({}), original={} bytes, modified={} bytes, patch={} bytes",
        opts.level,
        profile.name,
        original.len(),
        modified.len(),
        patch.len()
    );
    patch
}

/// Approximate peak heap bytes `create` needs for inputs of these sizes:
/// both buffers, both chain tables and a worst-case patch.
pub fn estimate_create_memory(original_len: usize, modified_len: usize) -> usize {
    let tables = ChainTable::estimate_memory(original_len) + ChainTable::estimate_memory(modified_len);
    let worst_patch = modified_len + modified_len / 64 + 64;
    original_len
        .saturating_add(modified_len)
        .saturating_add(tables)
        .saturating_add(worst_patch)
}

// ---------------------------------------------------------------------------
// Apply
// ---------------------------------------------------------------------------

/// Recoverable content mismatch: the patch decoded cleanly but a CRC of the
/// original or of the output disagrees with the footer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ChecksumWarning {
    #[error("original checksum mismatch: expected {expected:#010X}, got {actual:#010X}")]
    SourceChecksumMismatch { expected: u32, actual: u32 },

    #[error("output checksum mismatch: expected {expected:#010X}, got {actual:#010X}")]
    TargetChecksumMismatch { expected: u32, actual: u32 },
}

/// Outcome classification of [`apply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyStatus {
    Success,
    Warning(Vec<ChecksumWarning>),
    Error(DecodeError),
}

impl ApplyStatus {
    /// Human-readable result: empty on success, otherwise prefixed with
    /// `warning: ` or `error: `.
    pub fn message(&self) -> String {
        match self {
            Self::Success => String::new(),
            Self::Warning(warnings) => {
                let parts: Vec<String> = warnings.iter().map(ToString::to_string).collect();
                format!("warning: {}", parts.join("; "))
            }
            Self::Error(e) => format!("error: {e}"),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    pub fn is_warning(&self) -> bool {
        matches!(self, Self::Warning(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

/// Result of applying a patch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied {
    /// Reconstructed buffer. `None` on error unless an unsafe override
    /// applied.
    pub target: Option<Vec<u8>>,
    /// Metadata from the patch header; empty when the header could not be
    /// read.
    pub metadata: Vec<u8>,
    pub status: ApplyStatus,
}

impl Applied {
    fn failed(error: DecodeError) -> Self {
        Self {
            target: None,
            metadata: Vec::new(),
            status: ApplyStatus::Error(error),
        }
    }

    /// The status message, see [`ApplyStatus::message`].
    pub fn message(&self) -> String {
        self.status.message()
    }
}

/// Apply `patch` to `original` with default options.
pub fn apply(original: &[u8], patch: &[u8]) -> Applied {
    apply_with_options(original, patch, &ApplyOptions::default())
}

/// Apply with custom options.
pub fn apply_with_options(original: &[u8], patch: &[u8], opts: &ApplyOptions) -> Applied {
    let decoded = match decoder::decode_memory(patch, original, opts.max_target_size) {
        Ok(d) => d,
        Err(e) => {
            let e = attribute_to_corruption(patch, e);
            debug!("apply failed: {e}");
            return Applied::failed(e);
        }
    };

    let footer = decoded.footer;
    if footer.patch_crc != decoded.patch_crc {
        let error = DecodeError::PatchSelfChecksumMismatch {
            expected: footer.patch_crc,
            actual: decoded.patch_crc,
        };
        if opts.allow_unsafe {
            log::warn!("{error}; returning output anyway");
        }
        return Applied {
            target: opts.allow_unsafe.then_some(decoded.target),
            metadata: decoded.header.metadata,
            status: ApplyStatus::Error(error),
        };
    }

    let mut warnings = Vec::new();
    if footer.source_crc != decoded.source_crc {
        warnings.push(ChecksumWarning::SourceChecksumMismatch {
            expected: footer.source_crc,
            actual: decoded.source_crc,
        });
    }
    if footer.target_crc != decoded.target_crc {
        warnings.push(ChecksumWarning::TargetChecksumMismatch {
            expected: footer.target_crc,
            actual: decoded.target_crc,
        });
    }
    let status = if warnings.is_empty() {
        ApplyStatus::Success
    } else {
        ApplyStatus::Warning(warnings)
    };
    debug!("applied patch: {} bytes, {:?}", decoded.target.len(), status);

    Applied {
        target: Some(decoded.target),
        metadata: decoded.header.metadata,
        status,
    }
}

/// A structural failure in a patch whose self-checksum is also wrong is
/// reported as the checksum failure. Magic and length failures stand.
fn attribute_to_corruption(patch: &[u8], error: DecodeError) -> DecodeError {
    if matches!(
        error,
        DecodeError::TooShort { .. }
            | DecodeError::BadMagic { .. }
            | DecodeError::PatchSelfChecksumMismatch { .. }
    ) {
        return error;
    }
    match self_checksum(patch) {
        Some((expected, actual)) if expected != actual => {
            DecodeError::PatchSelfChecksumMismatch { expected, actual }
        }
        _ => error,
    }
}

/// Stored and computed self-checksum, if the patch is long enough to carry
/// a footer.
fn self_checksum(patch: &[u8]) -> Option<(u32, u32)> {
    let footer = PatchFooter::decode(patch).ok()?;
    Some((footer.patch_crc, checksum::crc32(&patch[..patch.len() - 4])))
}

// ---------------------------------------------------------------------------
// Inspect
// ---------------------------------------------------------------------------

/// Structural summary of a patch, computed without an original.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchSummary {
    pub header: PatchHeader,
    pub footer: PatchFooter,
    pub patch_size: usize,
    /// Whether the stored self-checksum matches the patch bytes.
    pub self_checksum_ok: bool,
    /// Action count per kind, indexed by [`ActionKind::tag`].
    pub action_counts: [u64; 4],
    /// Output bytes produced per kind, indexed by [`ActionKind::tag`].
    pub action_bytes: [u64; 4],
}

impl PatchSummary {
    pub fn total_actions(&self) -> u64 {
        self.action_counts.iter().sum()
    }

    pub fn count(&self, kind: ActionKind) -> u64 {
        self.action_counts[kind.tag() as usize]
    }

    pub fn bytes(&self, kind: ActionKind) -> u64 {
        self.action_bytes[kind.tag() as usize]
    }
}

/// Parse the patch framing and walk its action stream.
///
/// Fails on malformed framing or varints, on literals overrunning the
/// stream, and when the actions do not cover exactly the declared target
/// size.
pub fn inspect(patch: &[u8]) -> Result<PatchSummary, DecodeError> {
    let (header, footer, reader) = open_actions(patch)?;

    let mut action_counts = [0u64; 4];
    let mut action_bytes = [0u64; 4];
    let mut produced = 0u64;
    for action in reader {
        let action = action?;
        if action.len() > header.target_size - produced {
            return Err(DecodeError::OutOfRange {
                action: action.kind(),
                output_offset: produced,
            });
        }
        let tag = action.kind().tag() as usize;
        action_counts[tag] += 1;
        action_bytes[tag] += action.len();
        produced += action.len();
    }
    if produced < header.target_size {
        return Err(DecodeError::Truncated {
            produced,
            expected: header.target_size,
        });
    }

    let self_checksum_ok = self_checksum(patch).is_some_and(|(e, a)| e == a);
    Ok(PatchSummary {
        header,
        footer,
        patch_size: patch.len(),
        self_checksum_ok,
        action_counts,
        action_bytes,
    })
}

/// Parse the framing and return a reader over the action region.
pub fn open_actions(patch: &[u8]) -> Result<(PatchHeader, PatchFooter, ActionReader<'_>), DecodeError> {
    header::check_magic(patch)?;
    let (body, footer) = header::split_patch(patch)?;
    let (header, header_len) = PatchHeader::decode(body)?;
    let reader = ActionReader::new(&body[header_len..], header_len);
    Ok((header, footer, reader))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
