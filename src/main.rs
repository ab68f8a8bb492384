use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::{ColoredString, Colorize};
use mule_patcher::cleaner::MANIFEST_FILE;
use mule_patcher::orchestrator::DESCRIPTOR_FILE;
use mule_patcher::{
    load_from_path, LogLine, OperationError, OperationLog, Orchestrator, Outcome, RuleBook,
};
use similar::{ChangeTag, TextDiff};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mule-patcher")]
#[command(about = "Rule-driven migration of Mule application projects", long_about = None)]
#[command(version)]
struct Cli {
    /// Rule book (JSON, or TOML by extension)
    #[arg(short, long, global = true, default_value = "config.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Patch pom.xml, reset mule-artifact.json and clean build output
    Main {
        /// Project folder holding pom.xml (current directory if omitted)
        dir: Option<PathBuf>,

        /// Show unified diff of pom.xml and mule-artifact.json
        #[arg(short, long)]
        diff: bool,
    },

    /// Bump assetVersion in every policy manifest under a `policies` folder
    Policies {
        /// The `policies` folder (current directory if omitted)
        dir: Option<PathBuf>,
    },

    /// Apply expression substitutions to every XML file under a folder
    Expressions {
        /// Folder to scan (current directory if omitted)
        dir: Option<PathBuf>,
    },

    /// List the loaded rule sets
    Rules,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("mule_patcher=warn")),
        )
        .init();

    let cli = Cli::parse();
    let rules = load_from_path(&cli.config)
        .with_context(|| format!("failed to load rules from {}", cli.config.display()))?;

    match cli.command {
        Commands::Main { dir, diff } => cmd_main(&rules, &folder(dir), diff),
        Commands::Policies { dir } => {
            let root = folder(dir);
            finish(Orchestrator::new(&rules).policy_changes(&root))
        }
        Commands::Expressions { dir } => {
            let root = folder(dir);
            finish(Orchestrator::new(&rules).expression_changes(&root))
        }
        Commands::Rules => cmd_rules(&rules),
    }
}

fn folder(dir: Option<PathBuf>) -> PathBuf {
    dir.unwrap_or_else(|| PathBuf::from("."))
}

fn cmd_main(rules: &RuleBook, root: &Path, show_diff: bool) -> Result<()> {
    let tracked = [root.join(DESCRIPTOR_FILE), root.join(MANIFEST_FILE)];
    let before: Vec<Option<String>> = if show_diff {
        tracked
            .iter()
            .map(|file| fs::read_to_string(file).ok())
            .collect()
    } else {
        Vec::new()
    };

    let result = Orchestrator::new(rules).main_changes(root);

    if show_diff && result.is_ok() {
        for (file, before) in tracked.iter().zip(&before) {
            let after = fs::read_to_string(file).ok();
            let original = before.as_deref().unwrap_or("");
            let modified = after.as_deref().unwrap_or("");
            if original != modified {
                display_diff(file, original, modified);
            }
        }
        println!();
    }

    finish(result)
}

/// Print the log and exit non-zero on a failed precondition or any error line.
fn finish(result: Result<OperationLog, OperationError>) -> Result<()> {
    let log = match result {
        Ok(log) => log,
        Err(e) => {
            eprintln!("{} {}", "✗".red(), e);
            std::process::exit(1);
        }
    };

    for line in &log {
        print_line(line);
    }

    let errors = log.count(Outcome::Error);
    if errors > 0 {
        eprintln!();
        eprintln!("{}", format!("{errors} error(s)").red().bold());
        std::process::exit(1);
    }

    Ok(())
}

fn print_line(line: &LogLine) {
    let text: ColoredString = match line.outcome {
        Outcome::Section => format!("======== {} ========", line.message).bold(),
        Outcome::Updated | Outcome::Added | Outcome::Replaced | Outcome::Deleted => {
            line.message.as_str().green()
        }
        Outcome::Removed => line.message.as_str().cyan(),
        Outcome::NotFound | Outcome::Absent => line.message.as_str().yellow(),
        Outcome::Info => line.message.as_str().dimmed(),
        Outcome::Error => line.message.as_str().red(),
    };
    println!("{text}");
}

/// Show unified diff between original and modified content
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

fn cmd_rules(rules: &RuleBook) -> Result<()> {
    println!("{}", "Loaded rule sets".bold());
    for (name, set) in rules.sets() {
        println!("{} ({} rules)", name.cyan(), set.len());
        for rule in set {
            println!("  - {}", rule.key);
        }
    }
    Ok(())
}
