//! Integration tests for the patch engine
//!
//! Runs the built-in claude-4 rule table against small bundle fragments on
//! disk and checks the run-level guarantees: idempotence, guarded rewrites,
//! backup-before-write and fallback attribution.

use bundle_patcher::backup::backup_path_for;
use bundle_patcher::config::load_profile;
use bundle_patcher::{
    BackupError, BackupPolicy, EngineError, MatchSource, PatchEngine, RunOptions, RunStatus,
};
use proptest::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn engine() -> PatchEngine {
    let config = load_profile("claude-4").expect("built-in profile loads");
    PatchEngine::from_config(&config).expect("built-in profile compiles")
}

fn write_bundle(content: &str) -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("workbench.desktop.main.js");
    fs::write(&path, content).unwrap();
    (dir, path)
}

#[test]
fn test_example_token_limit_rewrite() {
    let (_dir, path) = write_bundle("async getEffectiveTokenLimit(e){if(e){return 50000}}");

    let outcome = engine().run(&path, &RunOptions::default()).unwrap();

    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "async getEffectiveTokenLimit(e){if(e){return 200000}}"
    );
    assert_eq!(outcome.status, RunStatus::Written);
    assert_eq!(outcome.entries(), vec![("token-limit", "50000", "200000")]);
}

#[test]
fn test_second_run_is_no_match() {
    let bundle = concat!(
        "async getEffectiveTokenLimit(e){if(e.isLongContext){return 120000}return 8192}",
        "getModeThinkingLevel(e){return 0}",
        r#"const M={"claude-4-sonnet":{"enabled":false,"requiresPro":true}};"#,
    );
    let (_dir, path) = write_bundle(bundle);
    let engine = engine();

    let first = engine.run(&path, &RunOptions::default()).unwrap();
    assert_eq!(first.status, RunStatus::Written);
    let after_first = fs::read(&path).unwrap();

    let second = engine.run(&path, &RunOptions::default()).unwrap();
    assert!(second.is_no_match());
    assert_eq!(second.status, RunStatus::Unchanged);
    assert_eq!(fs::read(&path).unwrap(), after_first);

    // The backup still holds the pre-patch bundle
    assert!(second.backup.is_none());
    assert_eq!(fs::read_to_string(backup_path_for(&path)).unwrap(), bundle);
}

#[test]
fn test_identical_backup_is_reused() {
    let (_dir, path) = write_bundle("console.log(1);");
    let engine = engine();
    engine.run(&path, &RunOptions::default()).unwrap();

    let outcome = engine.run(&path, &RunOptions::default()).unwrap();

    assert!(outcome.backup.unwrap().reused);
}

#[test]
fn test_stale_backup_refuses_write() {
    let (_dir, path) = write_bundle("/*v1.2.0*/getModeThinkingLevel(e){return 0}");
    let engine = engine();
    engine.run(&path, &RunOptions::default()).unwrap();

    // Host update replaces the bundle with a fresh, unpatched one
    let updated = "/*v1.3.0*/getModeThinkingLevel(e){return 1}";
    fs::write(&path, updated).unwrap();

    let err = engine.run(&path, &RunOptions::default()).unwrap_err();

    assert!(matches!(err, EngineError::Backup(BackupError::Exists { .. })));
    assert_eq!(fs::read_to_string(&path).unwrap(), updated);
    assert_eq!(
        fs::read_to_string(backup_path_for(&path)).unwrap(),
        "/*v1.2.0*/getModeThinkingLevel(e){return 0}"
    );

    // Forcing the backup takes a fresh snapshot of the pre-run content
    let outcome = engine
        .run(
            &path,
            &RunOptions {
                backup_policy: BackupPolicy::Overwrite,
                ..RunOptions::default()
            },
        )
        .unwrap();
    assert_eq!(outcome.status, RunStatus::Written);
    assert_eq!(
        fs::read_to_string(outcome.backup.unwrap().backup_path).unwrap(),
        updated
    );
}

#[test]
fn test_guarded_non_regression() {
    let bundle = "async getEffectiveTokenLimit(e){if(e){return 250000}}function q(){return 300000;}";
    let (_dir, path) = write_bundle(bundle);

    let outcome = engine()
        .run(
            &path,
            &RunOptions {
                skip_backup: true,
                ..RunOptions::default()
            },
        )
        .unwrap();

    assert!(outcome.is_no_match());
    assert_eq!(fs::read_to_string(&path).unwrap(), bundle);
}

#[test]
fn test_fallback_guard_never_widens_larger_values() {
    // No primary anchor: only the loose fallback applies
    let bundle = "function a(){return 999999;}function b(){return 200000}";
    let (_dir, path) = write_bundle(bundle);

    let outcome = engine()
        .run(
            &path,
            &RunOptions {
                skip_backup: true,
                ..RunOptions::default()
            },
        )
        .unwrap();

    assert!(outcome.is_no_match());
}

#[test]
fn test_isolation_across_occurrences() {
    let bundle = concat!(
        "class A{async getEffectiveTokenLimit(e){if(e.max){return 50000}}}",
        "class B{async getEffectiveTokenLimit(t){if(t){return 120000}}}",
        "class C{async getContextWindow(e){if(e){return 30000}}}",
    );
    let (_dir, path) = write_bundle(bundle);

    let outcome = engine().run(&path, &RunOptions::default()).unwrap();
    let patched = fs::read_to_string(&path).unwrap();

    assert_eq!(
        patched,
        concat!(
            "class A{async getEffectiveTokenLimit(e){if(e.max){return 200000}}}",
            "class B{async getEffectiveTokenLimit(t){if(t){return 200000}}}",
            "class C{async getContextWindow(e){if(e){return 30000}}}",
        )
    );
    let olds: Vec<&str> = outcome
        .changes_for("token-limit")
        .map(|c| c.old_value.as_str())
        .collect();
    assert_eq!(olds, vec!["50000", "120000"]);
    assert!(outcome
        .applied
        .iter()
        .all(|c| c.source == MatchSource::Primary));
}

#[test]
fn test_backup_precedes_mutation() {
    let bundle = "getModeThinkingLevel(e){return 1}";
    let (_dir, path) = write_bundle(bundle);

    let outcome = engine().run(&path, &RunOptions::default()).unwrap();

    assert_eq!(outcome.status, RunStatus::Written);
    let backup = outcome.backup.expect("backup recorded");
    assert!(!backup.reused);
    assert_eq!(backup.backup_path, backup_path_for(&path));
    assert_eq!(fs::read_to_string(&backup.backup_path).unwrap(), bundle);
    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "getModeThinkingLevel(e){return 2}"
    );
}

#[test]
fn test_force_backup_replaces_previous_snapshot() {
    let (_dir, path) = write_bundle("getModeThinkingLevel(e){return 0}");
    let engine = engine();
    engine.run(&path, &RunOptions::default()).unwrap();

    fs::write(&path, "getModeThinkingLevel(e){return 1}").unwrap();
    let outcome = engine
        .run(
            &path,
            &RunOptions {
                backup_policy: BackupPolicy::Overwrite,
                ..RunOptions::default()
            },
        )
        .unwrap();

    let backup = outcome.backup.unwrap();
    assert!(!backup.reused);
    assert_eq!(
        fs::read_to_string(backup.backup_path).unwrap(),
        "getModeThinkingLevel(e){return 1}"
    );
}

#[test]
fn test_fallback_is_attributed_in_report() {
    let (_dir, path) = write_bundle("function n(){return 4096;}");

    let outcome = engine()
        .run(
            &path,
            &RunOptions {
                skip_backup: true,
                ..RunOptions::default()
            },
        )
        .unwrap();

    assert_eq!(outcome.applied.len(), 1);
    assert_eq!(outcome.applied[0].source, MatchSource::Fallback(1));
    assert_eq!(outcome.fallback_count(), 1);
    assert!(outcome.to_string().contains("token-limit: 4096 → 200000 [fallback #1]"));
    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "function n(){return 200000;}"
    );
}

#[test]
fn test_no_op_safety() {
    let bundle = r#"console.log("hello world");var x={"gpt-4o":{"enabled":false}};"#;
    let (_dir, path) = write_bundle(bundle);

    let outcome = engine().run(&path, &RunOptions::default()).unwrap();

    assert!(outcome.is_no_match());
    assert_eq!(outcome.status, RunStatus::Unchanged);
    assert_eq!(fs::read_to_string(&path).unwrap(), bundle);
    // Backup is still the initial copy
    assert_eq!(
        fs::read_to_string(backup_path_for(&path)).unwrap(),
        bundle
    );
}

#[test]
fn test_skip_backup_writes_no_backup() {
    let (_dir, path) = write_bundle("getModeThinkingLevel(e){return 0}");

    let outcome = engine()
        .run(
            &path,
            &RunOptions {
                skip_backup: true,
                ..RunOptions::default()
            },
        )
        .unwrap();

    assert_eq!(outcome.status, RunStatus::Written);
    assert!(outcome.backup.is_none());
    assert!(!backup_path_for(&path).exists());
}

#[test]
fn test_missing_target_attempts_no_backup() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("workbench.desktop.main.js");

    let err = engine().run(&path, &RunOptions::default()).unwrap_err();

    assert!(matches!(err, EngineError::NotFound(_)));
    assert!(!backup_path_for(&path).exists());
}

proptest! {
    #[test]
    fn prop_sub_target_limits_raised_once(limit in 100u64..200_000) {
        let engine = engine();
        let text = format!("async getEffectiveTokenLimit(e){{if(e){{return {limit}}}}}");

        let (patched, applied) = engine.patch_text(&text).unwrap();
        prop_assert_eq!(
            patched.as_str(),
            "async getEffectiveTokenLimit(e){if(e){return 200000}}"
        );
        prop_assert_eq!(applied.len(), 1);

        let (again, applied) = engine.patch_text(&patched).unwrap();
        prop_assert_eq!(again, patched);
        prop_assert!(applied.is_empty());
    }

    #[test]
    fn prop_at_or_above_target_untouched(limit in 200_000u64..1_000_000) {
        let engine = engine();
        let text = format!("async getEffectiveTokenLimit(e){{if(e){{return {limit}}}}}");

        let (patched, applied) = engine.patch_text(&text).unwrap();
        prop_assert_eq!(patched, text);
        prop_assert!(applied.is_empty());
    }
}
