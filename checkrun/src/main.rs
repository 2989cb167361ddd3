//! Batch checklist orchestrator CLI.
//!
//! Drives every pending checklist item through an external agent process in
//! bounded-size batches, writes completion back into the document, and keeps
//! resumable progress under `.checkrun/` next to the checklist.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result, bail};
use clap::Parser;

use checkrun::core::types::RunSummary;
use checkrun::exit_codes;
use checkrun::io::agent::CommandAgent;
use checkrun::io::config::load_config;
use checkrun::io::paths::WorkPaths;
use checkrun::logging;
use checkrun::scheduler::{SchedulerOptions, run_batches};
use checkrun::status::print_status;

#[derive(Parser)]
#[command(
    name = "checkrun",
    version,
    about = "Batch checklist orchestrator driving an external agent per item"
)]
struct Cli {
    /// Checklist document to process.
    #[arg(long, default_value = "CHECKLIST.md")]
    checklist: PathBuf,

    /// Items dispatched concurrently per batch.
    #[arg(long, default_value_t = 5)]
    batch_size: usize,

    /// Iteration guidance embedded in every prompt (not enforced locally).
    #[arg(long, default_value_t = 25)]
    max_iterations: u32,

    /// Plan the batches without spawning agents or writing any file.
    #[arg(long)]
    dry_run: bool,

    /// Skip items a prior interrupted run already processed.
    #[arg(long)]
    resume: bool,

    /// Print checklist and run-state progress, then exit.
    #[arg(long)]
    status: bool,
}

fn main() {
    logging::init();
    if let Err(err) = run() {
        eprintln!("{:#}", err);
        std::process::exit(exit_codes::INVALID);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    if cli.batch_size == 0 {
        bail!("--batch-size must be at least 1");
    }

    let root = checklist_root(&cli.checklist);
    let paths = WorkPaths::new(&root);

    if cli.status {
        return print_status(&cli.checklist, &paths);
    }

    let cfg = load_config(&paths.config_path)
        .with_context(|| format!("load config {}", paths.config_path.display()))?;

    let stop = Arc::new(AtomicBool::new(false));
    let handler_stop = Arc::clone(&stop);
    ctrlc::set_handler(move || {
        handler_stop.store(true, Ordering::SeqCst);
    })
    .context("install interrupt handler")?;

    let agent = CommandAgent::new(&cfg, paths.clone());
    let opts = SchedulerOptions {
        batch_size: cli.batch_size,
        max_iterations: cli.max_iterations,
        dry_run: cli.dry_run,
        resume: cli.resume,
    };
    let summary = run_batches(&cli.checklist, &paths, &cfg, &agent, &opts, &stop)?;
    print_summary(&summary);
    Ok(())
}

/// Work files live next to the checklist, never in the process cwd.
fn checklist_root(checklist: &Path) -> PathBuf {
    match checklist.parent() {
        Some(parent) if parent.as_os_str().is_empty() => PathBuf::from("."),
        Some(parent) => parent.to_path_buf(),
        None => PathBuf::from("."),
    }
}

fn print_summary(summary: &RunSummary) {
    if summary.dry_run {
        println!("Dry run: no agents spawned, no files written.");
    }
    println!("Batches run: {}", summary.batches_run);
    println!("Completed:   {}", summary.completed.len());
    if !summary.failed.is_empty() {
        println!("Failed:      {}", summary.failed.len());
        for (id, reason) in &summary.failed {
            println!("  {id}: {reason}");
        }
    }
    for id in &summary.skipped_updates {
        println!("Row for {id} not found at update time; document left unchanged.");
    }
    if summary.interrupted {
        println!("Interrupted; re-run with --resume to continue the remaining batches.");
    } else if !summary.failed.is_empty() && !summary.dry_run {
        println!("Failed items remain Not Started; re-run to retry them.");
    }
}
