//! Prompt rendering for agent invocations.
//!
//! Rendering is a deterministic pure function over the template text and one
//! item's fields. Substitution is a literal replacement of a fixed placeholder
//! set; any other `{{...}}` text passes through untouched, so an unknown
//! placeholder is never an error at this layer. The template itself is
//! optional: the orchestrator still functions, with reduced guidance, on the
//! instruction block alone.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::core::types::WorkItem;

/// Read the prompt template if one exists at `path`.
pub fn load_template(path: &Path) -> Result<Option<String>> {
    if !path.exists() {
        return Ok(None);
    }
    let contents =
        fs::read_to_string(path).with_context(|| format!("read prompt template {}", path.display()))?;
    Ok(Some(contents))
}

/// Render the full prompt for one item.
///
/// The instruction block describing the completion-marker requirement is
/// appended after the rendered template; with no template it is the entire
/// prompt. `max_iterations` is contextual guidance for the agent, not a limit
/// the orchestrator enforces.
pub fn render_prompt(
    template: Option<&str>,
    item: &WorkItem,
    max_iterations: u32,
    marker: &str,
) -> String {
    let instructions = instruction_block(marker, max_iterations);
    match template {
        Some(template) => {
            let mut rendered = substitute(template, item, max_iterations);
            if !rendered.ends_with('\n') {
                rendered.push('\n');
            }
            rendered.push('\n');
            rendered.push_str(&instructions);
            rendered
        }
        None => instructions,
    }
}

/// Replace the fixed placeholder set with the item's field values.
fn substitute(template: &str, item: &WorkItem, max_iterations: u32) -> String {
    template
        .replace("{{item_id}}", &item.id)
        .replace("{{target}}", &item.target)
        .replace("{{priority}}", &item.priority)
        .replace("{{risk}}", &item.risk)
        .replace("{{tier}}", &item.tier)
        .replace("{{section}}", &item.section)
        .replace("{{max_iterations}}", &max_iterations.to_string())
}

fn instruction_block(marker: &str, max_iterations: u32) -> String {
    format!(
        "## Completion protocol\n\
         \n\
         Work the assigned checklist item to genuine completion. You may use up\n\
         to {max_iterations} iterations of your own loop; budget accordingly.\n\
         \n\
         When, and only when, the item is fully complete, print the following\n\
         marker on its own line, exactly as written (it is matched\n\
         case-sensitively):\n\
         \n\
         {marker}\n\
         \n\
         Do not print the marker for partial or failed work; in that case,\n\
         explain what is missing and exit.\n"
    )
}
