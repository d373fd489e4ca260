// File-level helpers for patch creation and application.
//
// Provides `create_file()` and `apply_file()` wrappers around the engine
// with buffered output and an input size ceiling. Optionally computes
// SHA-256 digests of the inputs and output (feature-gated behind `file-io`).

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

#[cfg(feature = "file-io")]
use sha2::Digest;

use crate::bps::decoder::DecodeError;
use crate::engine::{self, ApplyOptions, ApplyStatus, CreateOptions, PatchSummary};

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// Statistics returned by `create_file()`.
#[derive(Debug, Clone)]
pub struct CreateStats {
    /// Original file size in bytes.
    pub original_size: u64,
    /// Modified file size in bytes.
    pub modified_size: u64,
    /// Patch size in bytes.
    pub patch_size: u64,
    /// SHA-256 of the original file (if `file-io` feature is enabled).
    pub original_sha256: Option<[u8; 32]>,
    /// SHA-256 of the modified file (if `file-io` feature is enabled).
    pub modified_sha256: Option<[u8; 32]>,
}

/// Report returned by `apply_file()`.
#[derive(Debug, Clone)]
pub struct ApplyReport {
    pub status: ApplyStatus,
    /// Metadata carried by the patch.
    pub metadata: Vec<u8>,
    /// Size of the reconstructed buffer, 0 when none was produced.
    pub output_size: u64,
    /// Whether the output file was written.
    pub written: bool,
    /// SHA-256 of the written output (if `file-io` feature is enabled).
    pub output_sha256: Option<[u8; 32]>,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Error type for file operations.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    /// I/O error (file open, read, write).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Patch could not be decoded.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Input larger than the configured ceiling.
    #[error("{} is {size} bytes, larger than the {limit} byte limit", path.display())]
    TooLarge { path: PathBuf, size: u64, limit: u64 },
}

// ---------------------------------------------------------------------------
// Default limits
// ---------------------------------------------------------------------------

const BUF_SIZE: usize = 64 * 1024; // 64 KiB

/// Default input ceiling for `create_file()` and `apply_file()`.
pub const DEFAULT_MAX_INPUT: u64 = 1 << 30; // 1 GiB

// ---------------------------------------------------------------------------
// create_file
// ---------------------------------------------------------------------------

/// Create a patch from two files, writing it to `patch_path`.
///
/// Both inputs are checked against `max_input` before being read into
/// memory.
pub fn create_file(
    original_path: &Path,
    modified_path: &Path,
    patch_path: &Path,
    opts: &CreateOptions,
    max_input: u64,
) -> Result<CreateStats, IoError> {
    let original = read_limited(original_path, max_input)?;
    let modified = read_limited(modified_path, max_input)?;

    let patch = engine::create_with_options(&original, &modified, opts);
    write_buffered(patch_path, &patch)?;

    Ok(CreateStats {
        original_size: original.len() as u64,
        modified_size: modified.len() as u64,
        patch_size: patch.len() as u64,
        original_sha256: sha256(&original),
        modified_sha256: sha256(&modified),
    })
}

// ---------------------------------------------------------------------------
// apply_file
// ---------------------------------------------------------------------------

/// Apply a patch file to an original file, writing any produced buffer to
/// `output_path`.
///
/// Both inputs are checked against `max_input` and fully read before the
/// output is created, so `output_path` may name the original.
pub fn apply_file(
    original_path: &Path,
    patch_path: &Path,
    output_path: &Path,
    opts: &ApplyOptions,
    max_input: u64,
) -> Result<ApplyReport, IoError> {
    apply_file_with(original_path, patch_path, output_path, opts, max_input, |_| true)
}

/// Like [`apply_file`], but asks `accept` whether a produced buffer should
/// be written. It is only consulted for warning and unsafe-override
/// outcomes; successful results are always written.
pub fn apply_file_with(
    original_path: &Path,
    patch_path: &Path,
    output_path: &Path,
    opts: &ApplyOptions,
    max_input: u64,
    accept: impl FnOnce(&ApplyStatus) -> bool,
) -> Result<ApplyReport, IoError> {
    let original = read_limited(original_path, max_input)?;
    let patch = read_limited(patch_path, max_input)?;

    let applied = engine::apply_with_options(&original, &patch, opts);
    drop(original);

    let target = match applied.target {
        Some(t) if applied.status.is_success() || accept(&applied.status) => Some(t),
        _ => None,
    };
    let output_size = target.as_ref().map_or(0, |t| t.len() as u64);
    let mut output_sha256 = None;
    if let Some(t) = &target {
        write_buffered(output_path, t)?;
        output_sha256 = sha256(t);
    }

    Ok(ApplyReport {
        status: applied.status,
        metadata: applied.metadata,
        output_size,
        written: target.is_some(),
        output_sha256,
    })
}

// ---------------------------------------------------------------------------
// inspect_file
// ---------------------------------------------------------------------------

/// Read a patch file and summarise it. Returns the patch bytes alongside
/// the summary so callers can walk the actions.
pub fn inspect_file(patch_path: &Path) -> Result<(Vec<u8>, PatchSummary), IoError> {
    let patch = std::fs::read(patch_path)?;
    let summary = engine::inspect(&patch)?;
    Ok((patch, summary))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_limited(path: &Path, limit: u64) -> Result<Vec<u8>, IoError> {
    let size = std::fs::metadata(path)?.len();
    if size > limit {
        return Err(IoError::TooLarge {
            path: path.to_path_buf(),
            size,
            limit,
        });
    }
    Ok(std::fs::read(path)?)
}

fn write_buffered(path: &Path, data: &[u8]) -> io::Result<()> {
    let mut writer = BufWriter::with_capacity(BUF_SIZE, File::create(path)?);
    writer.write_all(data)?;
    writer.flush()
}

#[cfg(feature = "file-io")]
fn sha256(data: &[u8]) -> Option<[u8; 32]> {
    Some(sha2::Sha256::digest(data).into())
}

#[cfg(not(feature = "file-io"))]
fn sha256(_data: &[u8]) -> Option<[u8; 32]> {
    None
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
