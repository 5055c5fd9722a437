use anchor_patcher::config::{builtin_set, builtin_sets, load_dir, load_from_path, PatchSet};
use anchor_patcher::{apply_to_text, report, EditKind, TargetFile};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use similar::{ChangeTag, TextDiff};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "anchor-patcher")]
#[command(about = "Apply literal anchor-based edits to source files", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply patch sets to files under a root directory
    Apply {
        /// Directory relative target paths are resolved against (default: current directory)
        #[arg(short, long)]
        root: Option<PathBuf>,

        /// Apply a single compiled-in patch set by name
        #[arg(short, long, conflicts_with = "patches")]
        set: Option<String>,

        /// Patch set TOML file, or a directory of them (otherwise uses compiled-in sets)
        #[arg(short, long)]
        patches: Option<PathBuf>,

        /// Show unified diff of every file that was changed
        #[arg(short, long)]
        diff: bool,
    },

    /// List patch sets, their targets and edits
    List {
        /// Patch set TOML file, or a directory of them (otherwise lists compiled-in sets)
        #[arg(short, long)]
        patches: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Apply {
            root,
            set,
            patches,
            diff,
        } => cmd_apply(root, set, patches, diff),

        Commands::List { patches } => cmd_list(patches),
    }
}

/// Helper: Resolve the patch sets a command operates on.
fn select_sets(set: Option<String>, patches: Option<PathBuf>) -> Result<Vec<PatchSet>> {
    if let Some(name) = set {
        return Ok(vec![builtin_set(&name)?]);
    }

    match patches {
        Some(path) if path.is_dir() => Ok(load_dir(&path)?),
        Some(path) => Ok(vec![load_from_path(&path)?]),
        None => Ok(builtin_sets()),
    }
}

fn resolve_root(root: Option<PathBuf>) -> Result<PathBuf> {
    match root {
        Some(path) => Ok(path),
        None => env::current_dir().context("could not determine current directory"),
    }
}

/// Helper: Show unified diff between original and modified content
fn display_diff(file: &Path, original: &str, modified: &str) {
    println!(
        "\n{}",
        format!("--- {} (original)", file.display()).dimmed()
    );
    println!("{}", format!("+++ {} (patched)", file.display()).dimmed());

    let diff = TextDiff::from_lines(original, modified);

    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => format!("-{}", change).red(),
            ChangeTag::Insert => format!("+{}", change).green(),
            ChangeTag::Equal => format!(" {}", change).normal(),
        };
        print!("{}", sign);
    }
}

fn cmd_apply(
    root: Option<PathBuf>,
    set: Option<String>,
    patches: Option<PathBuf>,
    show_diff: bool,
) -> Result<()> {
    let root = resolve_root(root)?;
    let sets = select_sets(set, patches)?;

    println!("Root: {}", root.display());
    println!();

    let mut targets: Vec<TargetFile> = Vec::new();
    for set in &sets {
        debug!(set = %set.meta.name, targets = set.targets.len(), "patch set selected");
        targets.extend(set.resolve(&root));
    }

    // Capture contents before the run for diff output. Only target files are read.
    let mut contents_before: HashMap<PathBuf, String> = HashMap::new();
    if show_diff {
        for target in &targets {
            if let Ok(content) = fs::read_to_string(&target.path) {
                contents_before.entry(target.path.clone()).or_insert(content);
            }
        }
    }

    let summary = report::run(&targets);

    if show_diff {
        // Replaying the edits on the captured text reproduces what was written,
        // so patched files are not read a second time.
        for (target, outcome) in targets.iter().zip(&summary.outcomes) {
            if !outcome.was_written() {
                continue;
            }
            if let Some(before) = contents_before.get_mut(&target.path) {
                let (after, _) = apply_to_text(before, &target.edits);
                if *before != after {
                    display_diff(&target.path, before, &after);
                }
                *before = after;
            }
        }
    }

    let code = summary.exit_code();
    if code != 0 {
        std::process::exit(code);
    }

    Ok(())
}

fn cmd_list(patches: Option<PathBuf>) -> Result<()> {
    let sets = select_sets(None, patches)?;

    for set in &sets {
        println!(
            "{} ({} targets, {} edits)",
            set.meta.name.bold(),
            set.targets.len(),
            set.edit_count()
        );
        if let Some(description) = &set.meta.description {
            println!("  {}", description.dimmed());
        }

        for target in &set.targets {
            println!("  {}", target.path);
            for (idx, op) in target.edits.iter().enumerate() {
                let kind = match op.kind() {
                    EditKind::Idempotent => op.kind().to_string().green(),
                    EditKind::NonIdempotent => op.kind().to_string().yellow(),
                };
                println!("    - {} [{}, {}]", op.display_name(idx), op.mode, kind);
                if let Some(guard) = &op.guard {
                    println!("      {}", guard.to_string().dimmed());
                }
                if op.is_rerun_unsafe() {
                    println!(
                        "      {}",
                        "warning: anchor survives the edit and no guard is set; re-running re-applies it"
                            .red()
                    );
                }
            }
        }
        println!();
    }

    Ok(())
}
