//! Oxibps: BPS1 binary patches with layered CRC-32 verification.
//!
//! The crate provides:
//! - The patch format: varints, actions, framing, writer and decoder (`bps`)
//! - Hashed match finding for patch creation (`hash`)
//! - High-level create/apply/inspect APIs (`engine`)
//! - File-oriented helpers (`io`)
//! - An optional CLI (`cli` feature)
//!
//! # Quick Start
//!
//! ```
//! use oxibps::engine::{self, ApplyStatus};
//!
//! let original = b"hello old world";
//! let modified = b"hello new world";
//!
//! let patch = engine::create(original, modified);
//! let applied = engine::apply(original, &patch);
//! assert_eq!(applied.status, ApplyStatus::Success);
//! assert_eq!(applied.target.as_deref(), Some(&modified[..]));
//!
//! // A different original still decodes but is flagged.
//! let applied = engine::apply(b"hello odd world", &patch);
//! assert!(applied.status.is_warning());
//! assert!(applied.message().starts_with("warning: "));
//! ```

pub mod bps;
pub mod engine;
pub mod hash;
pub mod io;

#[cfg(feature = "cli")]
pub mod cli;
