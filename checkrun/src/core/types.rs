//! Shared deterministic types for orchestrator core logic.
//!
//! These types define stable contracts between core components. They should not
//! depend on external state or I/O and must remain deterministic across runs.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One row of the checklist document.
///
/// Items are parsed fresh from the live document on every run and never
/// mutated in memory; status changes happen by rewriting the document and
/// reparsing on the next run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    /// Key field from the row's first data column. Unique by convention only;
    /// the parser preserves duplicates as distinct items.
    pub id: String,
    /// Human-readable description of the work.
    pub target: String,
    pub priority: String,
    pub risk: String,
    /// Free-text status cell. Must contain a recognizable "not started" or
    /// "completed" token to participate in scheduling.
    pub status: String,
    /// Nearest preceding `## Tier ...` heading.
    pub tier: String,
    /// Nearest preceding `### ...` heading.
    pub section: String,
    /// 1-based source line of the row in the document.
    pub line: usize,
}

/// Why an item's execution attempt failed.
///
/// Closed enumeration so every call site handles all cases exhaustively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureReason {
    /// The agent command could not be launched at all.
    Spawn { message: String },
    /// The process exited cleanly but never printed the completion marker.
    MarkerMissing,
    /// The process exited non-zero (`code: None` means killed by a signal).
    Exit { code: Option<i32> },
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Spawn { message } => write!(f, "{message}"),
            FailureReason::MarkerMissing => write!(f, "completion marker not detected"),
            FailureReason::Exit { code: Some(code) } => write!(f, "exit code {code}"),
            FailureReason::Exit { code: None } => write!(f, "terminated by signal"),
        }
    }
}

/// Outcome of one execution attempt for one item.
///
/// Produced by the agent runner, folded into processor state and the document
/// patch immediately after the batch barrier; not persisted beyond the
/// per-item log file.
#[derive(Debug, Clone)]
pub struct RunResult {
    pub item: WorkItem,
    /// `None` means the attempt succeeded.
    pub failure: Option<FailureReason>,
    /// Combined stdout + stderr captured in memory (bounded).
    pub output: String,
}

impl RunResult {
    pub fn success(item: WorkItem, output: String) -> Self {
        Self {
            item,
            failure: None,
            output,
        }
    }

    pub fn failed(item: WorkItem, reason: FailureReason, output: String) -> Self {
        Self {
            item,
            failure: Some(reason),
            output,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.failure.is_none()
    }
}

/// Aggregate result of a scheduler run, printed as the final summary.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Batches executed during this invocation (not including resumed-past ones).
    pub batches_run: u32,
    pub completed: Vec<String>,
    /// Failed item ids with their display-formatted reasons.
    pub failed: Vec<(String, String)>,
    /// Ids whose document row could not be located at status-write time.
    pub skipped_updates: Vec<String>,
    /// True when an interrupt stopped the run before all batches finished.
    pub interrupted: bool,
    /// True when the run was a dry run (nothing spawned, nothing written).
    pub dry_run: bool,
}

impl RunSummary {
    /// Whether a follow-up `--resume` invocation has anything left to do.
    pub fn needs_resume(&self) -> bool {
        self.interrupted || !self.failed.is_empty()
    }
}
