use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use planlens_core::SubtaskId;
use planlens_engine::{find_subtask, lint_plan, mark_complete, track_progress, validate_plan};
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "planlens", about = "Analyze generated development plans")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Check a plan's structural integrity
    Validate {
        /// Path to the plan markdown file
        plan: PathBuf,
        /// Treat warnings as invalidating
        #[arg(long)]
        strict: bool,
    },
    /// Lint a plan for low-inference executability
    Lint {
        /// Path to the plan markdown file
        plan: PathBuf,
    },
    /// Report completion stats and the next actionable subtask
    Progress {
        /// Path to the plan markdown file
        plan: PathBuf,
    },
    /// Print one subtask with its phase and task context
    Show {
        /// Path to the plan markdown file
        plan: PathBuf,
        /// Subtask id in phase.task.subtask form, e.g. 1.2.3
        id: SubtaskId,
    },
    /// Mark a subtask complete and rewrite the plan file in place
    Complete {
        /// Path to the plan markdown file
        plan: PathBuf,
        /// Subtask id in phase.task.subtask form, e.g. 1.2.3
        id: SubtaskId,
        /// Completion notes recorded in the subtask's notes line
        #[arg(long, default_value = "")]
        notes: String,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()) {
        Ok(pass) => {
            if pass {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(2)
        }
    }
}

/// Returns whether the command's check passed; analysis findings are
/// reported through the exit code, operational failures through Err.
fn run(cli: Cli) -> Result<bool> {
    match cli.command {
        Command::Validate { plan, strict } => {
            let report = validate_plan(&read_plan(&plan)?, strict);
            print_json(&report)?;
            Ok(report.valid)
        }
        Command::Lint { plan } => {
            let report = lint_plan(&read_plan(&plan)?);
            print_json(&report)?;
            Ok(report.is_executable)
        }
        Command::Progress { plan } => {
            let report = track_progress(&read_plan(&plan)?);
            print_json(&report)?;
            Ok(true)
        }
        Command::Show { plan, id } => {
            let Some(detail) = find_subtask(&read_plan(&plan)?, &id) else {
                bail!("subtask not found: {id}");
            };
            print_json(&detail)?;
            Ok(true)
        }
        Command::Complete { plan, id, notes } => {
            let updated = mark_complete(&read_plan(&plan)?, &id, &notes)?;
            fs::write(&plan, updated)
                .with_context(|| format!("write plan file {}", plan.display()))?;
            info!(%id, plan = %plan.display(), "subtask marked complete");
            Ok(true)
        }
    }
}

fn read_plan(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("read plan file {}", path.display()))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
