// Matcher profiles.
//
// Each profile defines tuning parameters for the hash/match engine.
// Profiles only change which actions are chosen, never whether the
// resulting patch decodes.

/// Hash window width; also the minimum copy length worth an index lookup.
pub const MIN_MATCH: usize = 4;

/// Default compression level.
pub const DEFAULT_LEVEL: u32 = 6;

/// Matcher profile configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatcherConfig {
    /// Name for display purposes.
    pub name: &'static str,
    /// Only SourceRead and TargetRead; no index is built.
    pub linear: bool,
    /// Shortest copy accepted away from the end of the target.
    pub min_match: usize,
    /// Maximum candidates walked per hash chain (source and target each).
    pub chain: usize,
    /// Try one position ahead before committing to a short match.
    pub lazy: bool,
    /// Match length considered "long enough" to stop searching.
    pub long_enough: usize,
}

/// Compression levels mapping to profiles.
///
/// - Level 0: linear (positional reads and literals only)
/// - Level 1: fastest
/// - Levels 2-5: fast
/// - Level 6: default
/// - Levels 7-9: slow
pub fn config_for_level(level: u32) -> MatcherConfig {
    match level {
        0 => LINEAR,
        1 => FASTEST,
        2..=5 => FAST,
        6 => DEFAULT,
        _ => SLOW,
    }
}

// ---------------------------------------------------------------------------
// Profile definitions
// ---------------------------------------------------------------------------

pub const LINEAR: MatcherConfig = MatcherConfig {
    name: "linear",
    linear: true,
    min_match: MIN_MATCH,
    chain: 0,
    lazy: false,
    long_enough: 0,
};

pub const FASTEST: MatcherConfig = MatcherConfig {
    name: "fastest",
    linear: false,
    min_match: MIN_MATCH,
    chain: 1,
    lazy: false,
    long_enough: 32,
};

pub const FAST: MatcherConfig = MatcherConfig {
    name: "fast",
    linear: false,
    min_match: MIN_MATCH,
    chain: 4,
    lazy: false,
    long_enough: 64,
};

pub const DEFAULT: MatcherConfig = MatcherConfig {
    name: "default",
    linear: false,
    min_match: MIN_MATCH,
    chain: 16,
    lazy: true,
    long_enough: 128,
};

pub const SLOW: MatcherConfig = MatcherConfig {
    name: "slow",
    linear: false,
    min_match: MIN_MATCH,
    chain: 64,
    lazy: true,
    long_enough: 512,
};
