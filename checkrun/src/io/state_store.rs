//! Processor state storage for resumable runs (`.checkrun/state.json`).
//!
//! State is a derived cache of progress, never the source of truth: the
//! document's status text decides what is done. A missing or corrupt state
//! file therefore loads as absent and only costs resume efficiency.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Persisted progress for one run lineage.
///
/// Invariant: `processed_ids` is the disjoint union of `completed_ids` and
/// `failed_ids`. `current_batch_index` only advances after a full batch's
/// results are durably recorded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProcessorState {
    pub active: bool,
    pub current_batch_index: u32,
    pub total_batches: u32,
    pub processed_ids: BTreeSet<String>,
    pub completed_ids: BTreeSet<String>,
    pub failed_ids: BTreeSet<String>,
    pub started_at: String,
    pub last_checkpoint_at: String,
    pub completed_at: Option<String>,
}

impl ProcessorState {
    /// Initialize a fresh lineage starting at batch index 0.
    pub fn fresh(total_batches: u32) -> Self {
        let now = Utc::now().to_rfc3339();
        Self {
            active: true,
            current_batch_index: 0,
            total_batches,
            processed_ids: BTreeSet::new(),
            completed_ids: BTreeSet::new(),
            failed_ids: BTreeSet::new(),
            started_at: now.clone(),
            last_checkpoint_at: now,
            completed_at: None,
        }
    }

    /// Record one item's terminal outcome, keeping the set invariant.
    pub fn record(&mut self, id: &str, succeeded: bool) {
        self.processed_ids.insert(id.to_string());
        if succeeded {
            self.completed_ids.insert(id.to_string());
            self.failed_ids.remove(id);
        } else {
            self.failed_ids.insert(id.to_string());
            self.completed_ids.remove(id);
        }
    }

    /// Advance the batch barrier and refresh the checkpoint timestamp.
    pub fn advance_batch(&mut self) {
        self.current_batch_index += 1;
        self.last_checkpoint_at = Utc::now().to_rfc3339();
    }

    /// Mark the lineage finished.
    pub fn finish(&mut self) {
        self.active = false;
        self.completed_at = Some(Utc::now().to_rfc3339());
    }
}

/// Load processor state from disk, treating any failure as absence.
///
/// Missing file, unreadable file, and unparsable contents all yield `None`:
/// the document remains authoritative and a lost state file must never abort
/// a run (StateCorruption is recovered locally).
pub fn load_state(path: &Path) -> Option<ProcessorState> {
    if !path.exists() {
        debug!(path = %path.display(), "no prior state");
        return None;
    }
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) => {
            warn!(path = %path.display(), err = %err, "state file unreadable, starting fresh");
            return None;
        }
    };
    match serde_json::from_str::<ProcessorState>(&contents) {
        Ok(state) => {
            debug!(
                batch = state.current_batch_index,
                total = state.total_batches,
                processed = state.processed_ids.len(),
                "state loaded"
            );
            Some(state)
        }
        Err(err) => {
            warn!(path = %path.display(), err = %err, "state file corrupt, starting fresh");
            None
        }
    }
}

/// Atomically write processor state to disk (temp file + rename).
pub fn write_state(path: &Path, state: &ProcessorState) -> Result<()> {
    debug!(
        path = %path.display(),
        batch = state.current_batch_index,
        total = state.total_batches,
        "writing state"
    );
    let mut buf = serde_json::to_string_pretty(state)?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("state path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp state {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace state {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Verifies write → read preserves all fields.
    #[test]
    fn state_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("state.json");

        let mut state = ProcessorState::fresh(3);
        state.record("SEC-001", true);
        state.record("SEC-002", false);
        state.advance_batch();
        state.finish();

        write_state(&path, &state).expect("write");
        let loaded = load_state(&path).expect("state present");
        assert_eq!(loaded, state);
    }

    #[test]
    fn missing_file_loads_as_absent() {
        let temp = tempfile::tempdir().expect("tempdir");
        assert!(load_state(&temp.path().join("missing.json")).is_none());
    }

    #[test]
    fn corrupt_file_loads_as_absent() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("state.json");
        fs::write(&path, "{ not json").expect("write garbage");
        assert!(load_state(&path).is_none());
    }

    #[test]
    fn record_keeps_processed_as_disjoint_union() {
        let mut state = ProcessorState::fresh(1);
        state.record("A-1", true);
        state.record("A-2", false);

        let union: BTreeSet<_> = state.completed_ids.union(&state.failed_ids).collect();
        assert_eq!(union.len(), state.processed_ids.len());
        assert!(state.completed_ids.is_disjoint(&state.failed_ids));

        // Re-recording the same id with a different outcome moves it, never
        // duplicates it.
        state.record("A-2", true);
        assert!(state.completed_ids.contains("A-2"));
        assert!(!state.failed_ids.contains("A-2"));
        assert_eq!(state.processed_ids.len(), 2);
    }

    #[test]
    fn fresh_state_starts_at_batch_zero_and_active() {
        let state = ProcessorState::fresh(4);
        assert!(state.active);
        assert_eq!(state.current_batch_index, 0);
        assert_eq!(state.total_batches, 4);
        assert!(state.completed_at.is_none());
    }
}
