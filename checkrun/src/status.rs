//! Read-only progress summary for `--status`.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::core::checklist::{parse_checklist, status_is_completed, status_is_not_started};
use crate::core::types::WorkItem;
use crate::io::paths::WorkPaths;
use crate::io::state_store::{ProcessorState, load_state};

/// Print the progress summary for the checklist and any recorded state.
pub fn print_status(checklist_path: &Path, paths: &WorkPaths) -> Result<()> {
    let document = fs::read_to_string(checklist_path)
        .with_context(|| format!("read checklist {}", checklist_path.display()))?;
    let items = parse_checklist(&document);
    let state = load_state(&paths.state_path);
    print!("{}", render_status(&items, state.as_ref()));
    Ok(())
}

/// Render the summary text. Document counts come first because the document,
/// not the state file, is authoritative.
fn render_status(items: &[WorkItem], state: Option<&ProcessorState>) -> String {
    let completed = items
        .iter()
        .filter(|item| status_is_completed(&item.status))
        .count();
    let not_started = items
        .iter()
        .filter(|item| status_is_not_started(&item.status))
        .count();
    let other = items.len() - completed - not_started;

    let mut out = String::new();
    out.push_str(&format!("Checklist: {} items\n", items.len()));
    out.push_str(&format!("  completed:   {completed}\n"));
    out.push_str(&format!("  not started: {not_started}\n"));
    if other > 0 {
        out.push_str(&format!("  other:       {other}\n"));
    }

    match state {
        Some(state) => {
            out.push_str(&format!(
                "Run state: batch {}/{} ({})\n",
                state.current_batch_index,
                state.total_batches,
                if state.active { "active" } else { "finished" },
            ));
            out.push_str(&format!(
                "  processed {} (completed {}, failed {})\n",
                state.processed_ids.len(),
                state.completed_ids.len(),
                state.failed_ids.len(),
            ));
            if !state.failed_ids.is_empty() {
                let failed: Vec<&str> = state.failed_ids.iter().map(String::as_str).collect();
                out.push_str(&format!("  failed ids: {}\n", failed.join(", ")));
            }
            out.push_str(&format!("  started at {}\n", state.started_at));
        }
        None => out.push_str("Run state: none\n"),
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::item_with_status;

    #[test]
    fn counts_document_statuses() {
        let items = vec![
            item_with_status("A-1", "Completed"),
            item_with_status("A-2", "Not Started"),
            item_with_status("A-3", "In Review"),
        ];

        let out = render_status(&items, None);
        assert!(out.contains("3 items"));
        assert!(out.contains("completed:   1"));
        assert!(out.contains("not started: 1"));
        assert!(out.contains("other:       1"));
        assert!(out.contains("Run state: none"));
    }

    #[test]
    fn includes_state_progress_and_failed_ids() {
        let items = vec![item_with_status("A-1", "Not Started")];
        let mut state = ProcessorState::fresh(3);
        state.record("A-1", false);
        state.advance_batch();

        let out = render_status(&items, Some(&state));
        assert!(out.contains("batch 1/3 (active)"));
        assert!(out.contains("completed 0, failed 1"));
        assert!(out.contains("failed ids: A-1"));
    }
}
