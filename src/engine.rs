//! Patch engine: backup, load, rule pipeline, conditional write-back.
//!
//! A run moves through `Idle -> BackedUp -> Loaded -> Rule₁ … Ruleₙ ->
//! {Written | Unchanged}` and never re-enters a state. Any failed
//! precondition ends the run before the target is written, so the file is
//! either left alone or replaced whole.
//!
//! A backup that holds different content than the target only blocks runs
//! that would write. A repeat run over an already patched target still
//! reports no match.

use crate::backup::{create_backup, BackupError, BackupPolicy};
use crate::config::RuleConfig;
use crate::edit::{atomic_write, EditError};
use crate::report::{AppliedChange, RunOutcome, RunStatus};
use crate::rules::{Rule, RuleError, RuleSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    pub skip_backup: bool,
    pub backup_policy: BackupPolicy,
    /// Compute changes without writing the target or a backup
    pub dry_run: bool,
}

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("target file not found: {0}")]
    NotFound(PathBuf),

    #[error("backup failed, target left untouched: {0}")]
    Backup(#[from] BackupError),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Rule(#[from] RuleError),
}

impl EngineError {
    fn io(path: &Path, source: io::Error) -> Self {
        EngineError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Run `rule_sets` over `text` in order.
///
/// Each successful rule application replaces the working text, so later
/// rules always see every earlier rewrite. Returns the final text and every
/// change in application order.
pub fn apply_rule_sets(
    text: &str,
    rule_sets: &[RuleSet],
) -> Result<(String, Vec<AppliedChange>), RuleError> {
    let mut current = text.to_string();
    let mut applied = Vec::new();

    for set in rule_sets {
        for rule in &set.rules {
            match rule.apply(&current)? {
                Some(application) => {
                    debug!(
                        rule_set = %set.name,
                        rule = %rule.name(),
                        changes = application.changes.len(),
                        "rule applied"
                    );
                    applied.extend(application.changes.into_iter().map(|m| AppliedChange {
                        rule_set: set.name.clone(),
                        rule: rule.name().to_string(),
                        old_value: m.old_value,
                        new_value: m.new_value,
                        source: m.source,
                        span: m.span,
                    }));
                    current = application.text;
                }
                None => debug!(rule_set = %set.name, rule = %rule.name(), "no change"),
            }
        }
    }

    Ok((current, applied))
}

pub struct PatchEngine {
    rule_sets: Vec<RuleSet>,
}

impl PatchEngine {
    pub fn new(rule_sets: Vec<RuleSet>) -> Self {
        Self { rule_sets }
    }

    pub fn from_config(config: &RuleConfig) -> Result<Self, RuleError> {
        Ok(Self::new(config.compile()?))
    }

    pub fn rule_sets(&self) -> &[RuleSet] {
        &self.rule_sets
    }

    /// Pure text pipeline, no I/O.
    pub fn patch_text(&self, text: &str) -> Result<(String, Vec<AppliedChange>), RuleError> {
        apply_rule_sets(text, &self.rule_sets)
    }

    /// Patch the file at `path` in place.
    pub fn run(&self, path: &Path, options: &RunOptions) -> Result<RunOutcome, EngineError> {
        if !path.is_file() {
            return Err(EngineError::NotFound(path.to_path_buf()));
        }

        let mut conflicting_backup = None;
        let backup = if options.skip_backup || options.dry_run {
            None
        } else {
            match create_backup(path, options.backup_policy) {
                Ok(record) => Some(record),
                Err(err @ BackupError::Exists { .. }) => {
                    debug!(target_file = %path.display(), "existing backup differs from target");
                    conflicting_backup = Some(err);
                    None
                }
                Err(err) => return Err(err.into()),
            }
        };

        let bytes = fs::read(path).map_err(|e| EngineError::io(path, e))?;
        let text = String::from_utf8(bytes).map_err(|e| {
            EngineError::io(path, io::Error::new(io::ErrorKind::InvalidData, e))
        })?;
        debug!(target_file = %path.display(), bytes = text.len(), "target loaded");

        let (patched, applied) = self.patch_text(&text)?;

        let status = if applied.is_empty() {
            RunStatus::Unchanged
        } else if options.dry_run {
            RunStatus::DryRun
        } else {
            if let Some(err) = conflicting_backup {
                return Err(err.into());
            }
            atomic_write(path, patched.as_bytes()).map_err(|e| match e {
                EditError::Io(source) => EngineError::io(path, source),
                other => EngineError::io(path, io::Error::other(other.to_string())),
            })?;
            RunStatus::Written
        };

        info!(
            target_file = %path.display(),
            changes = applied.len(),
            status = ?status,
            "run finished"
        );

        Ok(RunOutcome {
            target: path.to_path_buf(),
            status,
            applied,
            backup,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{FlagRule, FlagScope, Guard, ValueRule};

    fn token_set() -> RuleSet {
        let rule = ValueRule::new(
            "token-limit",
            r"getLimit\(\)\{return (?P<value>\d+)\}",
            &[],
            "200000",
            Some(Guard::LessThan { value: 200_000 }),
            false,
        )
        .unwrap();
        RuleSet::new("token-limit", vec![Box::new(rule)])
    }

    #[test]
    fn test_later_rules_see_earlier_rewrites() {
        // First rule writes the marker the second rule anchors on
        let rename = ValueRule::new(
            "rename",
            r#"\{"(?P<value>gpt-x)":"#,
            &[],
            "claude-4-sonnet",
            None,
            false,
        )
        .unwrap();
        let flag =
            FlagRule::new("enabled", "claude-4", "enabled", false, true, FlagScope::Entry).unwrap();
        let sets = vec![
            RuleSet::new("first", vec![Box::new(rename)]),
            RuleSet::new("second", vec![Box::new(flag)]),
        ];

        let (text, applied) =
            apply_rule_sets(r#"{"gpt-x":{"enabled":false}}"#, &sets).unwrap();

        assert_eq!(text, r#"{"claude-4-sonnet":{"enabled":true}}"#);
        assert_eq!(applied.len(), 2);
        assert_eq!(applied[1].rule_set, "second");
    }

    #[test]
    fn test_run_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let engine = PatchEngine::new(vec![token_set()]);
        let err = engine
            .run(&dir.path().join("nope.js"), &RunOptions::default())
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
        assert!(!dir.path().join("nope.js.backup").exists());
    }

    #[test]
    fn test_run_rejects_non_utf8() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("bundle.js");
        fs::write(&target, [0xff, 0xfe, 0x00]).unwrap();

        let engine = PatchEngine::new(vec![token_set()]);
        let options = RunOptions {
            skip_backup: true,
            ..RunOptions::default()
        };
        match engine.run(&target, &options).unwrap_err() {
            EngineError::Io { source, .. } => {
                assert_eq!(source.kind(), io::ErrorKind::InvalidData)
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_dry_run_leaves_file_and_skips_backup() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("bundle.js");
        fs::write(&target, "getLimit(){return 4096}").unwrap();

        let engine = PatchEngine::new(vec![token_set()]);
        let options = RunOptions {
            dry_run: true,
            ..RunOptions::default()
        };
        let outcome = engine.run(&target, &options).unwrap();

        assert_eq!(outcome.status, RunStatus::DryRun);
        assert_eq!(outcome.applied.len(), 1);
        assert_eq!(fs::read_to_string(&target).unwrap(), "getLimit(){return 4096}");
        assert!(outcome.backup.is_none());
    }

    #[test]
    fn test_differing_backup_blocks_write() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("bundle.js");
        fs::write(&target, "getLimit(){return 4096}").unwrap();
        fs::write(dir.path().join("bundle.js.backup"), "getLimit(){return 1024}").unwrap();

        let engine = PatchEngine::new(vec![token_set()]);
        let err = engine.run(&target, &RunOptions::default()).unwrap_err();

        assert!(matches!(err, EngineError::Backup(BackupError::Exists { .. })));
        assert_eq!(fs::read_to_string(&target).unwrap(), "getLimit(){return 4096}");
    }

    #[test]
    fn test_run_writes_and_backs_up() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("bundle.js");
        fs::write(&target, "getLimit(){return 4096}").unwrap();

        let engine = PatchEngine::new(vec![token_set()]);
        let outcome = engine.run(&target, &RunOptions::default()).unwrap();

        assert_eq!(outcome.status, RunStatus::Written);
        assert_eq!(
            fs::read_to_string(&target).unwrap(),
            "getLimit(){return 200000}"
        );
        let backup = outcome.backup.unwrap();
        assert_eq!(
            fs::read_to_string(backup.backup_path).unwrap(),
            "getLimit(){return 4096}"
        );
    }
}
