use anyhow::{Context, Result};
use bundle_patcher::backup::{backup_path_for, restore, BackupError, BackupPolicy};
use bundle_patcher::config::{
    load_from_path, load_profile, matches_requirement, RuleConfig, DEFAULT_PROFILE,
};
use bundle_patcher::{EngineError, MatchSource, PatchEngine, Rule, RunOptions, RunOutcome, RunStatus};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use similar::{ChangeTag, TextDiff};
use std::env;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

const TARGET_ENV: &str = "BUNDLE_PATCHER_TARGET";

#[derive(Parser)]
#[command(name = "bundle-patcher")]
#[command(about = "Rewrite model limits and flags in the editor workbench bundle", long_about = None)]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
struct RuleSource {
    /// Built-in rule profile
    #[arg(long, default_value = DEFAULT_PROFILE, conflicts_with = "rules")]
    profile: String,

    /// Rule table file, or a directory of *.toml rule tables
    #[arg(long)]
    rules: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Patch the bundle in place (backup first)
    Apply {
        /// Path to workbench.desktop.main.js (defaults to the standard install path)
        #[arg(short, long)]
        file: Option<PathBuf>,

        #[command(flatten)]
        source: RuleSource,

        /// Skip creating <file>.backup
        #[arg(long)]
        skip_backup: bool,

        /// Overwrite an existing <file>.backup instead of keeping it
        #[arg(long, conflicts_with = "skip_backup")]
        force_backup: bool,

        /// Host application version; refuse to patch outside the rule table's range
        #[arg(long)]
        host_version: Option<String>,

        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,

        /// Dry run - show what would be changed without modifying files
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Show unified diff of changes
        #[arg(short, long)]
        diff: bool,

        /// Print the run outcome as JSON
        #[arg(long)]
        json: bool,
    },

    /// Report what would change without touching any file
    Check {
        #[arg(short, long)]
        file: Option<PathBuf>,

        #[command(flatten)]
        source: RuleSource,
    },

    /// Copy <file>.backup back over the bundle
    Restore {
        #[arg(short, long)]
        file: Option<PathBuf>,

        #[arg(short, long)]
        yes: bool,
    },

    /// List rule sets and their patterns
    List {
        #[command(flatten)]
        source: RuleSource,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Apply {
            file,
            source,
            skip_backup,
            force_backup,
            host_version,
            yes,
            dry_run,
            diff,
            json,
        } => cmd_apply(ApplyArgs {
            file,
            source,
            skip_backup,
            force_backup,
            host_version,
            yes,
            dry_run,
            diff,
            json,
        }),

        Commands::Check { file, source } => cmd_check(file, &source),

        Commands::Restore { file, yes } => cmd_restore(file, yes),

        Commands::List { source } => cmd_list(&source),
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "bundle_patcher=debug",
        _ => "bundle_patcher=trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

/// Well-known bundle location for a default install of the host editor.
fn default_target() -> PathBuf {
    if cfg!(target_os = "windows") {
        PathBuf::from(
            r"C:\Program Files\Cursor\resources\app\out\vs\workbench\workbench.desktop.main.js",
        )
    } else if cfg!(target_os = "macos") {
        PathBuf::from(
            "/Applications/Cursor.app/Contents/Resources/app/out/vs/workbench/workbench.desktop.main.js",
        )
    } else {
        PathBuf::from("/usr/share/cursor/resources/app/out/vs/workbench/workbench.desktop.main.js")
    }
}

/// Expand a leading `~/` against the user's home directory.
fn expand_home(path: PathBuf) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path;
    };
    match home::home_dir() {
        Some(home) => home.join(rest),
        None => path,
    }
}

/// Resolve the target bundle path
///
/// Priority order:
/// 1. Explicit --file flag
/// 2. BUNDLE_PATCHER_TARGET environment variable
/// 3. Default install location for this OS
fn resolve_target(cli_file: Option<PathBuf>) -> PathBuf {
    if let Some(path) = cli_file {
        return expand_home(path);
    }
    if let Ok(env_path) = env::var(TARGET_ENV) {
        if !env_path.trim().is_empty() {
            return expand_home(PathBuf::from(env_path));
        }
    }
    default_target()
}

fn load_rules(source: &RuleSource) -> Result<RuleConfig> {
    let config = match &source.rules {
        Some(path) => load_from_path(expand_home(path.clone()))?,
        None => load_profile(&source.profile)?,
    };
    Ok(config)
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{prompt} (y/N): ");
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    let answer = answer.trim().to_ascii_lowercase();
    Ok(answer == "y" || answer == "yes")
}

/// Helper: Show unified diff between original and modified content
///
/// Minified bundles are often a single line, so lines are first broken after
/// `;` and `}` to keep the hunks readable.
fn display_diff(file: &Path, original: &str, modified: &str) {
    fn split_statements(text: &str) -> String {
        text.replace(';', ";\n").replace('}', "}\n")
    }

    println!(
        "\n{}",
        format!("--- {} (original)", file.display()).dimmed()
    );
    println!("{}", format!("+++ {} (patched)", file.display()).dimmed());

    let original = split_statements(original);
    let modified = split_statements(modified);
    let diff = TextDiff::from_lines(&original, &modified);

    for hunk in diff.unified_diff().context_radius(1).iter_hunks() {
        println!("{}", hunk.header().to_string().cyan());
        for change in hunk.iter_changes() {
            let line = match change.tag() {
                ChangeTag::Delete => format!("-{}", change).red(),
                ChangeTag::Insert => format!("+{}", change).green(),
                ChangeTag::Equal => format!(" {}", change).normal(),
            };
            print!("{}", line);
            if change.missing_newline() {
                println!();
            }
        }
    }
}

fn print_changes(outcome: &RunOutcome, dry_run: bool) {
    for change in &outcome.applied {
        let marker = if dry_run { "⊙".yellow() } else { "✓".green() };
        let via = match change.source {
            MatchSource::Primary => String::new(),
            MatchSource::Fallback(_) => format!(" (via {})", change.source).dimmed().to_string(),
        };
        println!(
            "{} {}: {} → {}{}",
            marker,
            change.rule,
            change.old_value.red(),
            change.new_value.green(),
            via
        );
    }
}

struct ApplyArgs {
    file: Option<PathBuf>,
    source: RuleSource,
    skip_backup: bool,
    force_backup: bool,
    host_version: Option<String>,
    yes: bool,
    dry_run: bool,
    diff: bool,
    json: bool,
}

fn cmd_apply(args: ApplyArgs) -> Result<()> {
    // 1. Resolve target
    let target = resolve_target(args.file);
    if !target.is_file() {
        eprintln!("{} File not found: {}", "✗".red(), target.display());
        std::process::exit(1);
    }

    // 2. Load rule tables and check host version
    let config = load_rules(&args.source)?;
    if let Some(host_version) = &args.host_version {
        let ok = matches_requirement(host_version, config.meta.version_range.as_deref())?;
        if !ok {
            anyhow::bail!(
                "host version {} does not satisfy version_range {} of rule table '{}'",
                host_version,
                config.meta.version_range.as_deref().unwrap_or(""),
                config.meta.name
            );
        }
    }
    let engine = PatchEngine::from_config(&config)?;

    if !args.json {
        println!("{}", "Bundle Patcher".bold());
        println!("Target: {}", target.display());
        println!(
            "Rules: {} ({} rules in {} sets)",
            config.meta.name,
            config.rule_count(),
            config.rule_sets.len()
        );
        if !args.dry_run {
            println!(
                "{}",
                "Close the editor before patching; it rewrites this file on exit.".yellow()
            );
        }
        println!();
    }

    // 3. Confirm
    if !args.dry_run && !args.yes && !confirm("Continue?")? {
        println!("{} Operation cancelled", "⊘".cyan());
        return Ok(());
    }

    let before = if args.diff {
        Some(fs::read_to_string(&target).with_context(|| {
            format!("failed to read {} for diff", target.display())
        })?)
    } else {
        None
    };

    // 4. Run
    let options = RunOptions {
        skip_backup: args.skip_backup,
        backup_policy: if args.force_backup {
            BackupPolicy::Overwrite
        } else {
            BackupPolicy::Preserve
        },
        dry_run: args.dry_run,
    };
    let outcome = match engine.run(&target, &options) {
        Ok(outcome) => outcome,
        Err(EngineError::Backup(BackupError::Exists { backup_path, .. })) => {
            eprintln!(
                "{} {} holds a different bundle than {}",
                "✗".red(),
                backup_path.display(),
                target.display()
            );
            eprintln!("  The bundle was not modified. Pass --force-backup to snapshot the current file.");
            std::process::exit(1);
        }
        Err(e) => return Err(e.into()),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    // 5. Report
    if let Some(backup) = &outcome.backup {
        if backup.reused {
            println!(
                "{} Existing backup matches target, kept: {}",
                "⊙".yellow(),
                backup.backup_path.display()
            );
        } else {
            println!(
                "{} Backup created: {}",
                "✓".green(),
                backup.backup_path.display()
            );
        }
    }

    if args.dry_run {
        println!("{}", "  [DRY RUN - nothing will be written]".cyan());
    }
    print_changes(&outcome, args.dry_run);

    if let Some(before) = before {
        let after = match outcome.status {
            RunStatus::Written => fs::read_to_string(&target)?,
            RunStatus::DryRun => engine.patch_text(&before)?.0,
            RunStatus::Unchanged => before.clone(),
        };
        if before != after {
            display_diff(&target, &before, &after);
        }
    }

    // 6. Summary
    println!();
    match outcome.status {
        RunStatus::Written => {
            println!(
                "{} Patched {} ({} changes, {} via fallback)",
                "✓".green(),
                target.display(),
                outcome.applied.len(),
                outcome.fallback_count()
            );
            println!("Restart the editor to load the patched bundle.");
        }
        RunStatus::DryRun => {
            println!(
                "{} {} changes would be applied",
                "⊙".yellow(),
                outcome.applied.len()
            );
        }
        RunStatus::Unchanged => {
            println!(
                "{} No modifications were made - file may already be patched or patterns not found",
                "⊘".cyan()
            );
        }
    }

    Ok(())
}

fn cmd_check(file: Option<PathBuf>, source: &RuleSource) -> Result<()> {
    let target = resolve_target(file);
    let config = load_rules(source)?;
    let engine = PatchEngine::from_config(&config)?;

    println!("{}", "Patch Status Report".bold());
    println!("Target: {}", target.display());
    println!("Rules: {}", config.meta.name);
    println!();

    let options = RunOptions {
        dry_run: true,
        ..RunOptions::default()
    };
    let outcome = engine.run(&target, &options)?;

    if outcome.is_no_match() {
        println!(
            "{} {}",
            "✓".green(),
            "Nothing to change (already patched or unrecognized layout)".green()
        );
    } else {
        println!(
            "{} {} ({} changes)",
            "⊙".yellow(),
            "NOT APPLIED".yellow().bold(),
            outcome.applied.len()
        );
        print_changes(&outcome, true);
    }

    let backup = backup_path_for(&target);
    if backup.is_file() {
        println!("\nBackup: {}", backup.display());
    }

    Ok(())
}

fn cmd_restore(file: Option<PathBuf>, yes: bool) -> Result<()> {
    let target = resolve_target(file);
    let backup = backup_path_for(&target);

    if !backup.is_file() {
        eprintln!("{} No backup found at {}", "✗".red(), backup.display());
        std::process::exit(1);
    }

    println!("Restore {} from {}", target.display(), backup.display());
    if !yes && !confirm("Continue?")? {
        println!("{} Operation cancelled", "⊘".cyan());
        return Ok(());
    }

    restore(&backup, &target)?;
    println!("{} Restored {}", "✓".green(), target.display());
    Ok(())
}

fn cmd_list(source: &RuleSource) -> Result<()> {
    let config = load_rules(source)?;

    println!("{} {}", "Profile:".bold(), config.meta.name);
    if let Some(description) = &config.meta.description {
        println!("  {}", description.dimmed());
    }
    if let Some(range) = &config.meta.version_range {
        println!("  host versions: {}", range);
    }
    println!();

    let rule_sets = config.compile()?;
    for (idx, set) in rule_sets.iter().enumerate() {
        println!("{}. {}", idx + 1, set.name.bold());
        for rule in &set.rules {
            println!("   - {}", rule.name());
            for (i, pattern) in rule.describe().iter().enumerate() {
                let label = if i == 0 {
                    "primary".to_string()
                } else {
                    format!("fallback #{i}")
                };
                println!("       {}: {}", label.dimmed(), pattern);
            }
        }
    }

    Ok(())
}
