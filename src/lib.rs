//! Bundle Patcher: structural rewrites of behavioral constants in minified
//! editor bundles
//!
//! The target is a large third-party script whose layout changes between
//! releases. Rather than parse it, rules anchor on nearby syntax (function
//! names, braces, object keys) with regular expressions and rewrite a single
//! captured literal.
//!
//! # Architecture
//!
//! - [`rules`]: the [`Rule`] capability plus the two rule shapes, value rules
//!   with a primary pattern, fallback chain and guard, and marker-anchored
//!   flag rules
//! - [`config`]: declarative TOML rule tables and the embedded profiles
//! - [`engine`]: runs rule sets in order over one in-memory buffer and writes
//!   back only when something changed
//! - [`backup`]: `<target>.backup` snapshot before any write, plus restore
//! - [`report`]: the structured [`RunOutcome`] of a run
//!
//! # Safety
//!
//! - Backup is taken before the target is read; a failed backup aborts
//! - Atomic write-back (tempfile + fsync + rename)
//! - Every rewrite is a verified span edit over the captured literal only
//! - Values already at the target are never reported as changes
//!
//! # Example
//!
//! ```no_run
//! use bundle_patcher::{load_profile, PatchEngine, RunOptions};
//! use std::path::Path;
//!
//! let config = load_profile("claude-4").unwrap();
//! let engine = PatchEngine::from_config(&config).unwrap();
//!
//! match engine.run(Path::new("workbench.desktop.main.js"), &RunOptions::default()) {
//!     Ok(outcome) => println!("{outcome}"),
//!     Err(e) => eprintln!("Patch failed: {e}"),
//! }
//! ```

pub mod backup;
pub mod cache;
pub mod config;
pub mod edit;
pub mod engine;
pub mod report;
pub mod rules;

// Re-exports
pub use backup::{backup_path_for, create_backup, restore, BackupError, BackupPolicy, BackupRecord};
pub use config::{
    load_from_path, load_from_str, load_profile, matches_requirement, ConfigError, RuleConfig,
    VersionError,
};
pub use edit::{apply_edits, Edit, EditError, EditVerification, Span};
pub use engine::{apply_rule_sets, EngineError, PatchEngine, RunOptions};
pub use report::{AppliedChange, RunOutcome, RunStatus};
pub use rules::{
    FlagRule, FlagScope, Guard, MatchResult, MatchSource, Rule, RuleError, RuleSet, ValueRule,
};
