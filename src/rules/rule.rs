use crate::edit::{apply_edits, Edit, Span};
use crate::rules::errors::RuleError;
use serde::Serialize;
use std::fmt;

/// Which pattern of a rule produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchSource {
    Primary,
    /// 1-based position in the rule's fallback chain
    Fallback(usize),
}

impl fmt::Display for MatchSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchSource::Primary => write!(f, "primary"),
            MatchSource::Fallback(n) => write!(f, "fallback #{n}"),
        }
    }
}

/// A single rewrite a rule wants to make.
///
/// `span` covers `old_value` in the text the rule was given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchResult {
    pub old_value: String,
    pub new_value: String,
    pub span: Span,
    pub source: MatchSource,
}

/// New text plus the rewrites that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub struct RuleApplication {
    pub text: String,
    pub changes: Vec<MatchResult>,
}

/// A structural transformation over raw text.
///
/// Implementors only locate rewrites. [`Rule::apply`] turns them into a new
/// string through verified span edits, so a rule never mutates its input.
pub trait Rule: fmt::Debug {
    fn name(&self) -> &str;

    /// Every effective rewrite in `text`, left to right.
    ///
    /// Matches that would leave the value unchanged, or that fail a guard,
    /// are not returned.
    fn find(&self, text: &str) -> Result<Vec<MatchResult>, RuleError>;

    /// Human-readable pattern sources, primary first.
    fn describe(&self) -> Vec<String>;

    /// Apply every rewrite from [`Rule::find`]. `None` means nothing changed.
    fn apply(&self, text: &str) -> Result<Option<RuleApplication>, RuleError> {
        let changes = self.find(text)?;
        if changes.is_empty() {
            return Ok(None);
        }

        let edits = changes
            .iter()
            .map(|c| Edit::new(c.span, c.new_value.clone(), &c.old_value))
            .collect();
        let text = apply_edits(text, edits).map_err(|source| RuleError::Edit {
            rule: self.name().to_string(),
            source,
        })?;

        Ok(Some(RuleApplication { text, changes }))
    }
}

/// A named, ordered group of rules addressing one behavior.
#[derive(Debug)]
pub struct RuleSet {
    pub name: String,
    pub rules: Vec<Box<dyn Rule>>,
}

impl RuleSet {
    pub fn new(name: impl Into<String>, rules: Vec<Box<dyn Rule>>) -> Self {
        Self {
            name: name.into(),
            rules,
        }
    }
}
