//! Test-only helpers: checklist fixtures and scripted agent runners.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::core::types::{FailureReason, RunResult, WorkItem};
use crate::io::agent::AgentRunner;

/// Create a deterministic work item with the given id and status.
pub fn item_with_status(id: &str, status: &str) -> WorkItem {
    WorkItem {
        id: id.to_string(),
        target: format!("{id} target"),
        priority: "P1".to_string(),
        risk: "High".to_string(),
        status: status.to_string(),
        tier: "Tier 1".to_string(),
        section: "Section".to_string(),
        line: 1,
    }
}

/// Render a minimal checklist document with one table row per `(id, status)`.
pub fn checklist_doc(rows: &[(&str, &str)]) -> String {
    let mut doc = String::from(
        "## Tier 1\n\n### Section\n\n\
         | ID | Target | Priority | Risk | Status |\n\
         |----|--------|----------|------|--------|\n",
    );
    for (id, status) in rows {
        doc.push_str(&format!("| {id} | {id} target | P1 | High | {status} |\n"));
    }
    doc
}

/// Scripted per-item outcome for [`ScriptedAgent`].
#[derive(Debug, Clone, Copy)]
pub enum ScriptedOutcome {
    Succeed,
    FailMarker,
    FailExit(i32),
}

/// Agent runner double that never spawns a process.
///
/// Returns scripted outcomes per item id (default: success), records every
/// dispatched id, and tracks how many items were in flight simultaneously so
/// tests can assert the concurrency bound.
pub struct ScriptedAgent {
    outcomes: HashMap<String, ScriptedOutcome>,
    calls: Mutex<Vec<String>>,
    active: AtomicUsize,
    max_active: AtomicUsize,
    hold: Duration,
}

impl Default for ScriptedAgent {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedAgent {
    pub fn new() -> Self {
        Self {
            outcomes: HashMap::new(),
            calls: Mutex::new(Vec::new()),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
            hold: Duration::ZERO,
        }
    }

    /// Script a non-default outcome for one item id.
    pub fn with_outcome(mut self, id: &str, outcome: ScriptedOutcome) -> Self {
        self.outcomes.insert(id.to_string(), outcome);
        self
    }

    /// Hold each call open for `duration` so overlap is observable.
    pub fn with_hold(mut self, duration: Duration) -> Self {
        self.hold = duration;
        self
    }

    /// Ids dispatched so far, in completion-recording order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().expect("calls lock").len()
    }

    /// Highest number of simultaneously in-flight items observed.
    pub fn max_in_flight(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }
}

impl AgentRunner for ScriptedAgent {
    fn run(&self, item: &WorkItem, _prompt: &str) -> RunResult {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
        if !self.hold.is_zero() {
            std::thread::sleep(self.hold);
        }
        self.calls.lock().expect("calls lock").push(item.id.clone());
        self.active.fetch_sub(1, Ordering::SeqCst);

        match self.outcomes.get(&item.id).copied() {
            None | Some(ScriptedOutcome::Succeed) => {
                RunResult::success(item.clone(), "scripted output".to_string())
            }
            Some(ScriptedOutcome::FailMarker) => RunResult::failed(
                item.clone(),
                FailureReason::MarkerMissing,
                "scripted output".to_string(),
            ),
            Some(ScriptedOutcome::FailExit(code)) => RunResult::failed(
                item.clone(),
                FailureReason::Exit { code: Some(code) },
                "scripted output".to_string(),
            ),
        }
    }
}

/// Temporary workspace holding a checklist document and its `.checkrun/` dir.
pub struct TestWorkspace {
    temp: tempfile::TempDir,
    checklist_path: PathBuf,
}

impl TestWorkspace {
    pub fn new(rows: &[(&str, &str)]) -> Self {
        let temp = tempfile::tempdir().expect("tempdir");
        let checklist_path = temp.path().join("CHECKLIST.md");
        std::fs::write(&checklist_path, checklist_doc(rows)).expect("write checklist");
        Self {
            temp,
            checklist_path,
        }
    }

    pub fn root(&self) -> &Path {
        self.temp.path()
    }

    pub fn checklist_path(&self) -> &Path {
        &self.checklist_path
    }

    pub fn read_checklist(&self) -> String {
        std::fs::read_to_string(&self.checklist_path).expect("read checklist")
    }
}
