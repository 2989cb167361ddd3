//! Batch scheduling: partition pending items, dispatch each batch in
//! parallel, and record results at the batch barrier.
//!
//! One thread of control drives batches sequentially. Within a batch every
//! item is dispatched on its own thread before any join, so at most
//! `batch_size` agent processes are live at once and a slow item delays the
//! next batch even when capacity is free — a barrier, not a work-stealing
//! pool. The processor state is written exactly once per batch, after the
//! barrier, so there is never a concurrent writer.

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, info, instrument, warn};

use crate::core::batch::{partition, pending_items};
use crate::core::checklist::parse_checklist;
use crate::core::status_update::apply_status_updates;
use crate::core::types::{FailureReason, RunResult, RunSummary, WorkItem};
use crate::io::agent::AgentRunner;
use crate::io::checkpoint::{Checkpoint, write_checkpoint};
use crate::io::config::OrchestratorConfig;
use crate::io::paths::WorkPaths;
use crate::io::prompt::{load_template, render_prompt};
use crate::io::state_store::{ProcessorState, load_state, write_state};

/// Invocation options for a scheduler run.
#[derive(Debug, Clone)]
pub struct SchedulerOptions {
    pub batch_size: usize,
    /// Contextual guidance passed into prompts, not enforced locally.
    pub max_iterations: u32,
    pub dry_run: bool,
    pub resume: bool,
}

/// Drive every pending checklist item through the agent, one batch at a time.
///
/// Returns the aggregate summary; per-item failures never abort the run. Only
/// configuration-level problems (unreadable checklist, bad config) surface as
/// errors.
#[instrument(skip_all, fields(batch_size = opts.batch_size, dry_run = opts.dry_run, resume = opts.resume))]
pub fn run_batches<R: AgentRunner>(
    checklist_path: &Path,
    paths: &WorkPaths,
    cfg: &OrchestratorConfig,
    runner: &R,
    opts: &SchedulerOptions,
    stop: &AtomicBool,
) -> Result<RunSummary> {
    let document = fs::read_to_string(checklist_path)
        .with_context(|| format!("read checklist {}", checklist_path.display()))?;
    let items = parse_checklist(&document);
    let template = load_template(&paths.template_path)?;

    let prior = if opts.resume {
        load_state(&paths.state_path)
    } else {
        None
    };
    let pending = pending_items(&items, prior.as_ref().map(|state| &state.processed_ids));
    let batches = partition(&pending, opts.batch_size);

    let mut state = match prior {
        Some(mut state) => {
            info!(
                batch = state.current_batch_index,
                total = state.total_batches,
                "resuming prior run"
            );
            state.active = true;
            state
        }
        None => ProcessorState::fresh(batches.len() as u32),
    };

    let mut summary = RunSummary {
        dry_run: opts.dry_run,
        ..RunSummary::default()
    };
    info!(
        items = items.len(),
        pending = pending.len(),
        batches = batches.len(),
        "checklist scanned"
    );

    let batch_count = batches.len();
    for (position, batch) in batches.iter().enumerate() {
        if stop.load(Ordering::SeqCst) {
            warn!("interrupt received, stopping before next batch");
            summary.interrupted = true;
            break;
        }

        info!(
            batch = state.current_batch_index,
            size = batch.len(),
            "dispatching batch"
        );
        let results = if opts.dry_run {
            batch
                .iter()
                .map(|item| {
                    debug!(item = %item.id, "dry run, skipping dispatch");
                    RunResult::success(item.clone(), String::new())
                })
                .collect()
        } else {
            dispatch_batch(runner, batch, template.as_deref(), opts.max_iterations, cfg)
        };

        for result in &results {
            state.record(&result.item.id, result.succeeded());
            match &result.failure {
                None => summary.completed.push(result.item.id.clone()),
                Some(reason) => summary
                    .failed
                    .push((result.item.id.clone(), reason.to_string())),
            }
        }
        state.advance_batch();
        summary.batches_run += 1;

        if !opts.dry_run {
            write_state(&paths.state_path, &state)?;
            let skipped = flip_completed_rows(checklist_path, paths, &results)?;
            summary.skipped_updates.extend(skipped);

            let is_last = position + 1 == batch_count;
            if !is_last && cfg.pause_between_batches_secs > 0 {
                debug!(
                    secs = cfg.pause_between_batches_secs,
                    "pausing between batches"
                );
                thread::sleep(Duration::from_secs(cfg.pause_between_batches_secs));
            }
        }
    }

    if !opts.dry_run {
        if summary.interrupted {
            // Leave the lineage active so --resume picks it back up.
            write_state(&paths.state_path, &state)?;
        } else {
            state.finish();
            write_state(&paths.state_path, &state)?;
        }
    }

    Ok(summary)
}

/// Dispatch every item of one batch concurrently and join them all.
fn dispatch_batch<R: AgentRunner>(
    runner: &R,
    batch: &[WorkItem],
    template: Option<&str>,
    max_iterations: u32,
    cfg: &OrchestratorConfig,
) -> Vec<RunResult> {
    let prompts: Vec<String> = batch
        .iter()
        .map(|item| render_prompt(template, item, max_iterations, &cfg.completion_marker))
        .collect();

    thread::scope(|scope| {
        let handles: Vec<_> = batch
            .iter()
            .zip(&prompts)
            .map(|(item, prompt)| scope.spawn(move || runner.run(item, prompt)))
            .collect();

        handles
            .into_iter()
            .zip(batch.iter())
            .map(|(handle, item)| match handle.join() {
                Ok(result) => result,
                Err(_) => RunResult::failed(
                    item.clone(),
                    FailureReason::Spawn {
                        message: "agent worker thread panicked".to_string(),
                    },
                    String::new(),
                ),
            })
            .collect()
    })
}

/// Apply the batch's successful results to the document and write a fresh
/// checkpoint from the updated text. Returns ids whose row could not be
/// located (document changed underneath the run).
fn flip_completed_rows(
    checklist_path: &Path,
    paths: &WorkPaths,
    results: &[RunResult],
) -> Result<Vec<String>> {
    let succeeded: Vec<WorkItem> = results
        .iter()
        .filter(|result| result.succeeded())
        .map(|result| result.item.clone())
        .collect();

    let document = fs::read_to_string(checklist_path)
        .with_context(|| format!("read checklist {}", checklist_path.display()))?;
    let outcome = apply_status_updates(&document, &succeeded);

    if !outcome.updated.is_empty() {
        write_document(checklist_path, &outcome.document)?;
    }
    for id in &outcome.skipped {
        warn!(item = %id, "row not found at status-write time, skipping update");
    }

    let checkpoint = Checkpoint::capture(&parse_checklist(&outcome.document));
    write_checkpoint(&paths.checkpoint_path, &checkpoint)?;

    Ok(outcome.skipped)
}

/// Atomically replace the checklist document (temp file + rename).
fn write_document(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("checklist path missing parent {}", path.display()))?;
    let file_name = path
        .file_name()
        .with_context(|| format!("checklist path missing file name {}", path.display()))?;
    let tmp_path = parent.join(format!("{}.tmp", file_name.to_string_lossy()));
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp checklist {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path)
        .with_context(|| format!("replace checklist {}", path.display()))?;
    Ok(())
}
