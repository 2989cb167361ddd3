//! Checklist document parsing.
//!
//! The checklist is a markdown file containing zero or more pipe tables, each
//! preceded by tier (`## Tier ...`) and section (`### ...`) headings, with
//! arbitrary prose in between. Parsing is pure and idempotent: the same text
//! always yields the same ordered sequence of [`WorkItem`]s.

use std::sync::LazyLock;

use regex::Regex;

use super::types::WorkItem;

/// Matches a table separator cell such as `---`, `:---`, or `---:`.
static SEPARATOR_CELL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^:?-+:?$").expect("separator cell regex should be valid"));

/// Minimum data columns a row needs: id, target, priority, risk, status.
const MIN_COLUMNS: usize = 5;

/// True when the status cell marks the item as not yet started.
pub fn status_is_not_started(status: &str) -> bool {
    status.to_lowercase().contains("not started")
}

/// True when the status cell marks the item as completed.
pub fn status_is_completed(status: &str) -> bool {
    status.to_lowercase().contains("completed")
}

/// Parse the checklist document into ordered work items.
///
/// Table mode is entered on a header row (a pipe row whose cells include `ID`
/// and `Target`) and exited on the first subsequent non-pipe line. Rows with
/// fewer than five columns, separator rows, and repeated header rows are
/// skipped. Duplicate ids are preserved as distinct items; ids are unique by
/// convention only and the parser does not resolve that ambiguity.
pub fn parse_checklist(text: &str) -> Vec<WorkItem> {
    let mut items = Vec::new();
    let mut tier = String::new();
    let mut section = String::new();
    let mut in_table = false;

    for (idx, line) in text.lines().enumerate() {
        if let Some(rest) = line.strip_prefix("### ") {
            section = rest.trim().to_string();
            in_table = false;
            continue;
        }
        if let Some(rest) = line.strip_prefix("## ") {
            tier = rest.trim().to_string();
            section.clear();
            in_table = false;
            continue;
        }

        let Some(cells) = split_row(line) else {
            in_table = false;
            continue;
        };

        if !in_table {
            if is_header_row(&cells) {
                in_table = true;
            }
            continue;
        }

        if cells.len() < MIN_COLUMNS {
            continue;
        }
        let id = cells[0].as_str();
        if id.is_empty() || id.eq_ignore_ascii_case("id") || SEPARATOR_CELL_RE.is_match(id) {
            continue;
        }

        items.push(WorkItem {
            id: id.to_string(),
            target: cells[1].clone(),
            priority: cells[2].clone(),
            risk: cells[3].clone(),
            status: cells[4].clone(),
            tier: tier.clone(),
            section: section.clone(),
            line: idx + 1,
        });
    }

    items
}

/// Split a pipe-delimited table row into trimmed cells, or `None` for a
/// non-row line.
fn split_row(line: &str) -> Option<Vec<String>> {
    let trimmed = line.trim();
    let inner = trimmed.strip_prefix('|')?;
    let inner = inner.strip_suffix('|').unwrap_or(inner);
    Some(inner.split('|').map(|cell| cell.trim().to_string()).collect())
}

fn is_header_row(cells: &[String]) -> bool {
    let has = |name: &str| cells.iter().any(|cell| cell.eq_ignore_ascii_case(name));
    has("id") && has("target")
}
