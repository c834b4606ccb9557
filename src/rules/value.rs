use crate::rules::errors::RuleError;
use crate::rules::guard::Guard;
use crate::rules::pattern::{StructuralPattern, ValueCapture};
use crate::rules::rule::{MatchResult, MatchSource, Rule};
use tracing::{debug, trace};

/// Rewrites a captured literal (numeric limit, enum level, return literal)
/// to a fixed replacement.
///
/// The primary pattern is tried first. Fallbacks are consulted in order only
/// when the primary has no structural match at all, and the first fallback
/// with any match wins. A primary match whose value is already the target
/// therefore still suppresses the looser fallbacks.
#[derive(Debug, Clone)]
pub struct ValueRule {
    name: String,
    primary: StructuralPattern,
    fallbacks: Vec<StructuralPattern>,
    replacement: String,
    guard: Option<Guard>,
}

impl ValueRule {
    pub fn new(
        name: impl Into<String>,
        primary: &str,
        fallbacks: &[String],
        replacement: impl Into<String>,
        guard: Option<Guard>,
        case_insensitive: bool,
    ) -> Result<Self, RuleError> {
        let name = name.into();
        let primary = StructuralPattern::new(&name, primary, case_insensitive)?;
        let fallbacks = fallbacks
            .iter()
            .map(|src| StructuralPattern::new(&name, src, case_insensitive))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            name,
            primary,
            fallbacks,
            replacement: replacement.into(),
            guard,
        })
    }

    fn locate(&self, text: &str) -> (MatchSource, Vec<ValueCapture>) {
        let primary = self.primary.find_values(text);
        if !primary.is_empty() {
            return (MatchSource::Primary, primary);
        }

        debug!(rule = %self.name, "primary pattern not found, trying fallbacks");
        for (idx, fallback) in self.fallbacks.iter().enumerate() {
            let found = fallback.find_values(text);
            if !found.is_empty() {
                return (MatchSource::Fallback(idx + 1), found);
            }
        }

        (MatchSource::Primary, Vec::new())
    }
}

impl Rule for ValueRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn find(&self, text: &str) -> Result<Vec<MatchResult>, RuleError> {
        let (source, captures) = self.locate(text);

        let results = captures
            .into_iter()
            .filter(|cap| {
                if cap.value == self.replacement {
                    trace!(rule = %self.name, value = %cap.value, "already at target");
                    return false;
                }
                if let Some(guard) = &self.guard {
                    if !guard.allows(&cap.value) {
                        trace!(rule = %self.name, value = %cap.value, "rejected by guard");
                        return false;
                    }
                }
                true
            })
            .map(|cap| MatchResult {
                old_value: cap.value,
                new_value: self.replacement.clone(),
                span: cap.span,
                source,
            })
            .collect();

        Ok(results)
    }

    fn describe(&self) -> Vec<String> {
        std::iter::once(&self.primary)
            .chain(self.fallbacks.iter())
            .map(|p| p.source().to_string())
            .collect()
    }
}
