// BPS1 patch format implementation.
//
// This module provides encoding and decoding of the patch container and
// its action stream.
//
// # Modules
//
// - `varint`  : Variable-length integers and sign-in-low-bit offsets
// - `checksum`: CRC-32 used for the three footer checksums
// - `action`  : SourceRead / TargetRead / SourceCopy / TargetCopy
// - `header`  : Magic, size fields, metadata and checksum footer
// - `encoder` : Patch serialisation
// - `decoder` : Action parsing and target reconstruction

pub mod action;
pub mod checksum;
pub mod decoder;
pub mod encoder;
pub mod header;
pub mod varint;

// Re-export key types for convenience.
pub use action::{Action, ActionKind};
pub use decoder::{ActionReader, DEFAULT_MAX_TARGET_SIZE, DecodeError, DecodedPatch, decode_memory};
pub use encoder::PatchWriter;
pub use header::{FOOTER_LEN, PATCH_MAGIC, PatchFooter, PatchHeader};
