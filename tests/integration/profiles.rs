//! End-to-end runs of the built-in profiles.
//!
//! The fixture mirrors a 1.2-era workbench chunk: the model service class,
//! the model catalogue map, the picker list and the two entitlement checks.

use bundle_patcher::backup::backup_path_for;
use bundle_patcher::config::load_profile;
use bundle_patcher::{MatchSource, PatchEngine, RunOptions, RunStatus};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const WORKBENCH_CHUNK: &str = concat!(
    "var Xy=class{constructor(e){this.svc=e}",
    "async getEffectiveTokenLimit(e){if(e.isLongContext){return 120000}return this.svc.defaultLimit(e)}",
    r#"getModeThinkingLevel(e){return e==="agent"?1:0}};"#,
    r#"const Mq={"claude-4-sonnet":{"available":false,"enabled":false,"requiresPro":true,"visible":false,"beta":true},"#,
    r#""claude-3.7-sonnet":{"available":false,"enabled":false,"requiresPro":true,"visible":false,"beta":true},"#,
    r#""gpt-4o":{"available":false,"enabled":false}};"#,
    r#"const Rz=[{"name":"claude-4-sonnet-thinking","disabled":true,"hidden":true},{"name":"gpt-4.1","hidden":true}];"#,
    "function Kf(e){if(!e.subscription){return false}return true}",
    "function Pq(e){if(e.isPro===undefined){return null}return e.isPro}",
);

fn write_chunk() -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("workbench.desktop.main.js");
    fs::write(&path, WORKBENCH_CHUNK).unwrap();
    (dir, path)
}

fn engine(profile: &str) -> PatchEngine {
    PatchEngine::from_config(&load_profile(profile).unwrap()).unwrap()
}

#[test]
fn test_claude_4_profile_full_run() {
    let (_dir, path) = write_chunk();

    let outcome = engine("claude-4").run(&path, &RunOptions::default()).unwrap();
    let patched = fs::read_to_string(&path).unwrap();

    assert_eq!(outcome.status, RunStatus::Written);
    assert!(outcome.applied.iter().all(|c| c.source == MatchSource::Primary));

    assert!(patched.contains("if(e.isLongContext){return 200000}return this.svc.defaultLimit(e)}"));
    assert!(patched.contains(r#"return e==="agent"?2:0}"#));
    assert!(patched.contains(
        r#""claude-4-sonnet":{"available":true,"enabled":true,"requiresPro":false,"visible":true,"beta":false}"#
    ));
    assert!(patched.contains(r#"{"name":"claude-4-sonnet-thinking","disabled":false,"hidden":false}"#));
    assert!(patched.contains("if(!e.subscription){return true}"));
    assert!(patched.contains("if(e.isPro===undefined){return true}"));

    // Other families keep their flags; beta is family-wide
    assert!(patched.contains(
        r#""claude-3.7-sonnet":{"available":false,"enabled":false,"requiresPro":true,"visible":false,"beta":false}"#
    ));
    assert!(patched.contains(r#""gpt-4o":{"available":false,"enabled":false}"#));
    assert!(patched.contains(r#"{"name":"gpt-4.1","hidden":true}"#));

    let rules: Vec<&str> = outcome.applied.iter().map(|c| c.rule.as_str()).collect();
    assert_eq!(
        rules,
        vec![
            "token-limit",
            "thinking-level",
            "available",
            "enabled",
            "requires-pro",
            "visible",
            "beta",
            "beta",
            "disabled",
            "hidden",
            "subscription-gate",
            "pro-gate",
        ]
    );
}

#[test]
fn test_claude_profile_covers_whole_family() {
    let (_dir, path) = write_chunk();

    let outcome = engine("claude")
        .run(
            &path,
            &RunOptions {
                skip_backup: true,
                ..RunOptions::default()
            },
        )
        .unwrap();
    let patched = fs::read_to_string(&path).unwrap();

    for model in ["claude-4-sonnet", "claude-3.7-sonnet"] {
        let entry = format!(
            r#""{model}":{{"available":true,"enabled":true,"requiresPro":false,"visible":true,"beta":false}}"#
        );
        assert!(patched.contains(&entry), "{model} not unlocked");
    }
    assert!(patched.contains(r#""gpt-4o":{"available":false,"enabled":false}"#));
    assert_eq!(outcome.changes_for("enabled").count(), 2);
}

#[test]
fn test_profile_run_is_idempotent() {
    for profile in ["claude-4", "claude"] {
        let (_dir, path) = write_chunk();
        let engine = engine(profile);

        engine.run(&path, &RunOptions::default()).unwrap();
        let patched = fs::read(&path).unwrap();

        let second = engine.run(&path, &RunOptions::default()).unwrap();
        assert!(second.is_no_match(), "{profile}: {second}");
        assert_eq!(fs::read(&path).unwrap(), patched);
        assert_eq!(
            fs::read_to_string(backup_path_for(&path)).unwrap(),
            WORKBENCH_CHUNK
        );
    }
}

#[test]
fn test_profile_leaves_unrelated_bytes_alone() {
    let (_dir, path) = write_chunk();
    engine("claude-4")
        .run(
            &path,
            &RunOptions {
                skip_backup: true,
                ..RunOptions::default()
            },
        )
        .unwrap();
    let patched = fs::read_to_string(&path).unwrap();

    // Every rewrite swaps one literal; the surrounding structure is intact
    assert!(patched.starts_with("var Xy=class{constructor(e){this.svc=e}"));
    assert!(patched.ends_with("return e.isPro}"));
    assert_eq!(
        patched.matches('{').count(),
        WORKBENCH_CHUNK.matches('{').count()
    );
}

const QUOTA_CHECKS: &str = concat!(
    "function Rl(e){if(e.rateLimit){return false}return true}",
    "function Ul(e){if(e.usageLimit>0){return false}return true}",
);

#[test]
fn test_claude_profile_lifts_quota_checks() {
    let (patched, applied) = engine("claude").patch_text(QUOTA_CHECKS).unwrap();

    assert_eq!(
        patched,
        concat!(
            "function Rl(e){if(e.rateLimit){return true}return true}",
            "function Ul(e){if(e.usageLimit>0){return true}return true}",
        )
    );
    let rules: Vec<&str> = applied.iter().map(|c| c.rule.as_str()).collect();
    assert_eq!(rules, vec!["rate-limit-gate", "usage-limit-gate"]);

    let (_, again) = engine("claude").patch_text(&patched).unwrap();
    assert!(again.is_empty());
}

#[test]
fn test_quota_checks_match_any_case() {
    let text = "function Rl(e){IF(e.RATELIMIT){RETURN FALSE}}";
    let (patched, applied) = engine("claude").patch_text(text).unwrap();

    assert_eq!(applied.len(), 1);
    assert_eq!(patched, "function Rl(e){IF(e.RATELIMIT){RETURN true}}");
}

#[test]
fn test_claude_4_profile_keeps_quota_checks() {
    let (patched, applied) = engine("claude-4").patch_text(QUOTA_CHECKS).unwrap();

    assert!(applied.is_empty());
    assert_eq!(patched, QUOTA_CHECKS);
}
