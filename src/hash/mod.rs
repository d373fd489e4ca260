// Match finding for patch creation.
//
// This module provides:
// - Window checksums and forward match extension
// - Chained hash tables over the original and the modified buffer
// - The match engine that chooses actions by encoded-size gain
// - Matcher profiles (linear..slow)

pub mod config;
pub mod matching;
pub mod rolling;
pub mod table;

pub use config::{DEFAULT_LEVEL, MatcherConfig, config_for_level};
pub use matching::{Match, MatchEngine};
