//! Host application version gating for rule tables.
//!
//! A rule table's `version_range` (e.g. ">=1.2.0, <1.4.0") states which host
//! builds its anchors were written against. Host versions are often reported
//! loosely ("v1.2", "1.2.4 (user setup)"), so they are normalized first.

use semver::{Version, VersionReq};
use std::fmt;

#[derive(Debug, Clone)]
pub enum VersionError {
    /// Host version could not be read as semver (e.g., "latest")
    InvalidVersion { value: String, source: String },
    /// Invalid version requirement (e.g., ">=bad")
    InvalidRequirement { value: String, source: String },
}

impl fmt::Display for VersionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionError::InvalidVersion { value, source } => {
                write!(f, "invalid host version '{}': {}", value, source)
            }
            VersionError::InvalidRequirement { value, source } => {
                write!(f, "invalid version requirement '{}': {}", value, source)
            }
        }
    }
}

impl std::error::Error for VersionError {}

/// Parse a loosely formatted host version.
///
/// Strips a leading `v`, drops anything after the first whitespace, and pads
/// missing minor/patch components with zero.
pub fn parse_host_version(raw: &str) -> Result<Version, VersionError> {
    let trimmed = raw.trim();
    let token = trimmed.split_whitespace().next().unwrap_or("");
    let token = token.strip_prefix('v').unwrap_or(token);

    let (core, rest) = match token.find(['-', '+']) {
        Some(idx) => token.split_at(idx),
        None => (token, ""),
    };
    let mut parts: Vec<&str> = core.split('.').collect();
    while parts.len() < 3 {
        parts.push("0");
    }
    let normalized = format!("{}{}", parts.join("."), rest);

    Version::parse(&normalized).map_err(|e| VersionError::InvalidVersion {
        value: raw.to_string(),
        source: e.to_string(),
    })
}

/// Check if a host version satisfies a requirement string.
///
/// # Examples
///
/// ```
/// use bundle_patcher::config::version::matches_requirement;
///
/// assert!(matches_requirement("1.2.0", Some(">=1.2.0")).unwrap());
/// assert!(matches_requirement("v1.3", Some(">=1.2.0, <1.4.0")).unwrap());
/// assert!(!matches_requirement("1.1.9", Some(">=1.2.0")).unwrap());
///
/// // No requirement means the table applies to every host version
/// assert!(matches_requirement("0.50.0", None).unwrap());
/// ```
pub fn matches_requirement(
    version: &str,
    requirement: Option<&str>,
) -> Result<bool, VersionError> {
    let Some(req_str) = requirement else {
        return Ok(true);
    };

    let req_str = req_str.trim();
    if req_str.is_empty() {
        return Ok(true);
    }

    let version = parse_host_version(version)?;

    let req = VersionReq::parse(req_str).map_err(|e| VersionError::InvalidRequirement {
        value: req_str.to_string(),
        source: e.to_string(),
    })?;

    Ok(req.matches(&version))
}
