//! Structured record of what a run changed.
//!
//! The engine never prints. It returns a [`RunOutcome`] and presentation
//! (console, JSON) is left to the caller.

use crate::backup::BackupRecord;
use crate::edit::Span;
use crate::rules::MatchSource;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// One rewrite applied during a run.
///
/// `span` locates `old_value` in the text as it stood when the rule ran,
/// before that rule's own rewrites.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedChange {
    pub rule_set: String,
    pub rule: String,
    pub old_value: String,
    pub new_value: String,
    pub source: MatchSource,
    pub span: Span,
}

impl fmt::Display for AppliedChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} → {}", self.rule, self.old_value, self.new_value)?;
        if let MatchSource::Fallback(_) = self.source {
            write!(f, " [{}]", self.source)?;
        }
        Ok(())
    }
}

/// Terminal state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunStatus {
    /// At least one rule matched and the target was rewritten
    Written,
    /// Nothing matched; the target was not touched
    Unchanged,
    /// Changes were computed but not persisted
    DryRun,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub target: PathBuf,
    pub status: RunStatus,
    pub applied: Vec<AppliedChange>,
    pub backup: Option<BackupRecord>,
}

impl RunOutcome {
    pub fn any_rule_matched(&self) -> bool {
        !self.applied.is_empty()
    }

    /// Every pattern came up empty: already patched, or an unknown bundle
    /// layout. Not an error.
    pub fn is_no_match(&self) -> bool {
        self.applied.is_empty()
    }

    /// `(rule, old_value, new_value)` triples in application order.
    pub fn entries(&self) -> Vec<(&str, &str, &str)> {
        self.applied
            .iter()
            .map(|c| (c.rule.as_str(), c.old_value.as_str(), c.new_value.as_str()))
            .collect()
    }

    pub fn changes_for<'a>(&'a self, rule: &'a str) -> impl Iterator<Item = &'a AppliedChange> {
        self.applied.iter().filter(move |c| c.rule == rule)
    }

    pub fn fallback_count(&self) -> usize {
        self.applied
            .iter()
            .filter(|c| matches!(c.source, MatchSource::Fallback(_)))
            .count()
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.applied.is_empty() {
            return write!(
                f,
                "No modifications: {} may already be patched or its layout is not recognized",
                self.target.display()
            );
        }
        for change in &self.applied {
            writeln!(f, "{change}")?;
        }
        let verb = match self.status {
            RunStatus::Written => "applied to",
            RunStatus::DryRun => "would be applied to",
            RunStatus::Unchanged => "found in",
        };
        write!(
            f,
            "{} change(s) {} {}",
            self.applied.len(),
            verb,
            self.target.display()
        )
    }
}
