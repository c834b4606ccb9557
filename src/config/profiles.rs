//! Rule tables shipped with the binary.
//!
//! Each profile targets one model family. The tables share the same
//! structure (token limit, thinking level, availability flags, product
//! flags) and differ only in their family markers.

pub const DEFAULT_PROFILE: &str = "claude-4";

const PROFILES: &[(&str, &str)] = &[
    ("claude-4", include_str!("../../rulesets/claude-4.toml")),
    ("claude", include_str!("../../rulesets/claude.toml")),
];

pub fn names() -> Vec<&'static str> {
    PROFILES.iter().map(|(name, _)| *name).collect()
}

pub fn source(name: &str) -> Option<&'static str> {
    PROFILES
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|(_, src)| *src)
}

/// Closest profile name by Jaro-Winkler similarity, if reasonably close.
pub fn closest(name: &str) -> Option<&'static str> {
    PROFILES
        .iter()
        .map(|(n, _)| (*n, strsim::jaro_winkler(&name.to_ascii_lowercase(), n)))
        .filter(|(_, score)| *score >= 0.8)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(n, _)| n)
}
