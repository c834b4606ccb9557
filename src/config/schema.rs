use crate::rules::{FlagRule, FlagScope, Guard, Rule, RuleError, RuleSet, ValueRule};
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Deserialize, Default, Clone)]
pub struct RuleConfig {
    #[serde(default)]
    pub meta: Metadata,
    #[serde(default)]
    pub rule_sets: Vec<RuleSetDefinition>,
}

impl RuleConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if self.rule_sets.is_empty() {
            issues.push(ValidationIssue::EmptyRuleSetList);
        }

        let mut seen = HashSet::new();

        for set in &self.rule_sets {
            if set.name.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    rule: None,
                    field: "rule_sets.name",
                });
            }
            if set.rules.is_empty() {
                issues.push(ValidationIssue::EmptyRuleSet {
                    rule_set: set.name.clone(),
                });
            }

            for rule in &set.rules {
                let name = rule.name();
                if name.trim().is_empty() {
                    issues.push(ValidationIssue::MissingField {
                        rule: None,
                        field: "name",
                    });
                    continue;
                }
                if !seen.insert(name.to_string()) {
                    issues.push(ValidationIssue::DuplicateRule {
                        rule: name.to_string(),
                    });
                }

                match rule {
                    RuleDefinition::Value {
                        primary,
                        replacement,
                        ..
                    } => {
                        if primary.trim().is_empty() {
                            issues.push(ValidationIssue::MissingField {
                                rule: Some(name.to_string()),
                                field: "primary",
                            });
                        }
                        if replacement.is_empty() {
                            issues.push(ValidationIssue::MissingField {
                                rule: Some(name.to_string()),
                                field: "replacement",
                            });
                        }
                    }
                    RuleDefinition::Flag { marker, key, .. } => {
                        if marker.trim().is_empty() {
                            issues.push(ValidationIssue::MissingField {
                                rule: Some(name.to_string()),
                                field: "marker",
                            });
                        }
                        if key.trim().is_empty() {
                            issues.push(ValidationIssue::MissingField {
                                rule: Some(name.to_string()),
                                field: "key",
                            });
                        }
                    }
                }

                // Compiling catches bad regexes, missing `value` groups and
                // no-op flags in one place.
                if let Err(e) = rule.compile() {
                    issues.push(ValidationIssue::InvalidRule {
                        rule: name.to_string(),
                        message: e.to_string(),
                    });
                }
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }

    /// Build the executable rule sets, preserving declaration order.
    pub fn compile(&self) -> Result<Vec<RuleSet>, RuleError> {
        self.rule_sets
            .iter()
            .map(|set| {
                let rules = set
                    .rules
                    .iter()
                    .map(RuleDefinition::compile)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(RuleSet::new(set.name.clone(), rules))
            })
            .collect()
    }

    pub fn rule_count(&self) -> usize {
        self.rule_sets.iter().map(|s| s.rules.len()).sum()
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct Metadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Semver requirement on the host application version
    #[serde(default)]
    pub version_range: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RuleSetDefinition {
    pub name: String,
    #[serde(default)]
    pub rules: Vec<RuleDefinition>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum RuleDefinition {
    /// Rewrite a captured literal to a fixed replacement
    Value {
        name: String,
        primary: String,
        #[serde(default)]
        fallbacks: Vec<String>,
        replacement: String,
        #[serde(default)]
        guard: Option<Guard>,
        #[serde(default)]
        case_insensitive: bool,
    },
    /// Flip a boolean flag anchored to a marker token
    Flag {
        name: String,
        marker: String,
        key: String,
        from: bool,
        to: bool,
        #[serde(default)]
        scope: FlagScope,
    },
}

impl RuleDefinition {
    pub fn name(&self) -> &str {
        match self {
            RuleDefinition::Value { name, .. } | RuleDefinition::Flag { name, .. } => name,
        }
    }

    pub fn compile(&self) -> Result<Box<dyn Rule>, RuleError> {
        match self {
            RuleDefinition::Value {
                name,
                primary,
                fallbacks,
                replacement,
                guard,
                case_insensitive,
            } => Ok(Box::new(ValueRule::new(
                name.clone(),
                primary,
                fallbacks,
                replacement.clone(),
                guard.clone(),
                *case_insensitive,
            )?)),
            RuleDefinition::Flag {
                name,
                marker,
                key,
                from,
                to,
                scope,
            } => Ok(Box::new(FlagRule::new(
                name.clone(),
                marker,
                key,
                *from,
                *to,
                *scope,
            )?)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone)]
pub enum ValidationIssue {
    EmptyRuleSetList,
    EmptyRuleSet {
        rule_set: String,
    },
    MissingField {
        rule: Option<String>,
        field: &'static str,
    },
    DuplicateRule {
        rule: String,
    },
    InvalidRule {
        rule: String,
        message: String,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::EmptyRuleSetList => write!(f, "rule config contains no rule sets"),
            ValidationIssue::EmptyRuleSet { rule_set } => {
                write!(f, "rule set '{rule_set}' contains no rules")
            }
            ValidationIssue::MissingField { rule, field } => match rule {
                Some(name) => write!(f, "rule '{name}' missing required field '{field}'"),
                None => write!(f, "rule missing required field '{field}'"),
            },
            ValidationIssue::DuplicateRule { rule } => {
                write!(f, "rule name '{rule}' is used more than once")
            }
            ValidationIssue::InvalidRule { rule, message } => {
                write!(f, "rule '{rule}' is invalid: {message}")
            }
        }
    }
}
