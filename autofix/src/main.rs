//! `autofix` command-line entry point.
//!
//! Loads configuration once, runs the pipeline, prints the outcome, and exits
//! with the status's stable code from [`autofix::exit_codes`].

use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use autofix::core::types::RunResult;
use autofix::exit_codes;
use autofix::io::config::load_from_process;
use autofix::logging;
use autofix::pipeline::DefaultPipeline;

#[derive(Parser)]
#[command(
    name = "autofix",
    version,
    about = "Apply one verified fix to a repository and open a pull request"
)]
struct Cli {
    /// TOML configuration file. Missing file means defaults.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Clone or copy REPO, patch it toward GOAL, verify, and publish.
    Run {
        /// Git URL or local directory.
        repo: String,
        /// What to fix, in plain language.
        goal: String,
        /// Print the result as JSON instead of a summary.
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    logging::init();
    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::ERROR);
        }
    }
}

async fn run(cli: Cli) -> Result<i32> {
    let cfg = load_from_process(cli.config.as_deref())?;
    match cli.command {
        Command::Run { repo, goal, json } => {
            let pipeline = DefaultPipeline::from_config(&cfg).context("build pipeline")?;
            let result = pipeline.run(&repo, &goal).await;
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&result).context("serialize result")?
                );
            } else {
                print!("{}", render_human(&result));
            }
            Ok(exit_codes::for_result(&result))
        }
    }
}

/// Short human-readable summary of a run.
fn render_human(result: &RunResult) -> String {
    let mut out = String::new();
    match result {
        RunResult::Success {
            pr_data,
            pr_url,
            branch_name,
            ..
        } => {
            let _ = writeln!(out, "success: pushed {branch_name}");
            match pr_url {
                Some(url) => {
                    let _ = writeln!(out, "pull request: {url}");
                }
                None => {
                    let _ = writeln!(
                        out,
                        "pull request not created; open {}/{} {} -> {} manually",
                        pr_data.owner, pr_data.repo, pr_data.head, pr_data.base
                    );
                    let _ = writeln!(out, "title: {}", pr_data.title);
                }
            }
        }
        RunResult::VerifyFailed { output } => {
            let _ = writeln!(out, "verify_failed: tests still fail after the patch");
            let _ = writeln!(out, "{}", output.trim_end());
        }
        RunResult::NeedsLlm {
            plan, work_dir, ..
        } => {
            let _ = writeln!(out, "needs_llm: no patch available for this goal");
            let _ = writeln!(out, "workspace: {}", work_dir.display());
            let _ = writeln!(out, "candidate files:");
            for file in &plan.files {
                let _ = writeln!(out, "- {file}");
            }
        }
        RunResult::Error { message, cause } => {
            let _ = writeln!(out, "error: {message}");
            if let Some(cause) = cause {
                let _ = writeln!(out, "caused by: {cause}");
            }
        }
    }
    out
}
