use serde::Deserialize;

/// Precondition on a captured value before it may be rewritten.
///
/// Guards keep loose patterns from downgrading a value that is already at or
/// past the target, and from logging no-op rewrites as changes.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Guard {
    /// Captured value must parse as an integer strictly below `value`
    LessThan { value: u64 },
    /// Captured value must be one of `values` (exact, case-sensitive)
    OneOf { values: Vec<String> },
}

impl Guard {
    pub fn allows(&self, captured: &str) -> bool {
        match self {
            Guard::LessThan { value } => captured
                .parse::<u64>()
                .map(|n| n < *value)
                .unwrap_or(false),
            Guard::OneOf { values } => values.iter().any(|v| v == captured),
        }
    }
}
