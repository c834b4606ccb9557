use crate::cache;
use crate::edit::Span;
use crate::rules::errors::RuleError;
use regex::Regex;

/// Name of the capture group holding the literal a rule rewrites.
pub const VALUE_GROUP: &str = "value";

/// One occurrence of a structural pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueCapture {
    /// Span of the whole structural match
    pub whole: Span,
    /// Span of the `value` group
    pub span: Span,
    pub value: String,
}

/// A compiled structural pattern.
///
/// Patterns are regular expressions over the raw text that anchor on nearby
/// syntax and tolerate arbitrary noise between anchors with non-greedy
/// wildcards. The `value` group marks the only bytes a rewrite touches.
#[derive(Debug, Clone)]
pub struct StructuralPattern {
    source: String,
    regex: Regex,
}

impl StructuralPattern {
    /// Compile `source`, attributing errors to `rule`.
    pub fn new(rule: &str, source: &str, case_insensitive: bool) -> Result<Self, RuleError> {
        let regex = cache::get_or_compile_pattern(source, case_insensitive).map_err(|e| {
            RuleError::InvalidPattern {
                rule: rule.to_string(),
                message: e.to_string(),
            }
        })?;

        if !regex.capture_names().flatten().any(|n| n == VALUE_GROUP) {
            return Err(RuleError::MissingValueGroup {
                rule: rule.to_string(),
            });
        }

        Ok(Self {
            source: source.to_string(),
            regex,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// All non-overlapping occurrences, left to right.
    ///
    /// Matches where the `value` group did not participate are skipped.
    pub fn find_values(&self, text: &str) -> Vec<ValueCapture> {
        self.regex
            .captures_iter(text)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let value = caps.name(VALUE_GROUP)?;
                Some(ValueCapture {
                    whole: Span::new(whole.start(), whole.end()),
                    span: Span::new(value.start(), value.end()),
                    value: value.as_str().to_string(),
                })
            })
            .collect()
    }
}
