use crate::rules::errors::RuleError;
use crate::rules::pattern::StructuralPattern;
use crate::rules::rule::{MatchResult, MatchSource, Rule};
use serde::Deserialize;

/// Where the marker sits relative to the flag key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FlagScope {
    /// `"<marker…>" … "<key>": <lit>` with no closing brace in between
    #[default]
    Entry,
    /// `"<marker…>" …: { … "<key>": <lit>`, the marker keys an object
    KeyedObject,
    /// `{ … "<marker…" … "<key>": <lit>`, the marker is inside the object
    Object,
}

/// Flips a boolean flag that belongs to a marker (such as a model family).
///
/// Matching is case-insensitive since family markers change case between
/// bundle versions. Only the boolean literal is rewritten, and every
/// occurrence in the text is rewritten.
#[derive(Debug, Clone)]
pub struct FlagRule {
    name: String,
    to: bool,
    pattern: StructuralPattern,
}

impl FlagRule {
    pub fn new(
        name: impl Into<String>,
        marker: &str,
        key: &str,
        from: bool,
        to: bool,
        scope: FlagScope,
    ) -> Result<Self, RuleError> {
        let name = name.into();
        if from == to {
            return Err(RuleError::NoOpFlag {
                rule: name,
                literal: from,
            });
        }

        let source = build_pattern(marker, key, from, scope);
        let pattern = StructuralPattern::new(&name, &source, true)?;

        Ok(Self { name, to, pattern })
    }
}

fn build_pattern(marker: &str, key: &str, from: bool, scope: FlagScope) -> String {
    let m = regex::escape(marker);
    let k = regex::escape(key);
    let lit = if from { "true" } else { "false" };

    match scope {
        FlagScope::Entry => {
            format!(r#""{m}[^"]*"[^}}]*"{k}"\s*:\s*(?P<value>{lit})\b"#)
        }
        FlagScope::KeyedObject => {
            format!(r#""{m}[^"]*"[^:]*:\s*\{{[^}}]*"{k}"\s*:\s*(?P<value>{lit})\b"#)
        }
        FlagScope::Object => {
            format!(r#"\{{[^}}]*"{m}[^}}]*"{k}"\s*:\s*(?P<value>{lit})\b"#)
        }
    }
}

impl Rule for FlagRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn find(&self, text: &str) -> Result<Vec<MatchResult>, RuleError> {
        let new_value = self.to.to_string();
        Ok(self
            .pattern
            .find_values(text)
            .into_iter()
            .map(|cap| MatchResult {
                old_value: cap.value,
                new_value: new_value.clone(),
                span: cap.span,
                source: MatchSource::Primary,
            })
            .collect())
    }

    fn describe(&self) -> Vec<String> {
        vec![self.pattern.source().to_string()]
    }
}
