//! Structured status rewrite for the checklist document.
//!
//! The write path re-parses the document it is about to change, indexes
//! not-started rows by id, and patches only the status cell of each matched
//! row. Every other byte of the document is preserved, including line endings
//! and cell padding. An id with no matching not-started row (the document
//! changed between read and write, or the row was already flipped) is skipped
//! and surfaced to the caller instead of raising.

use std::collections::{BTreeMap, VecDeque};
use std::sync::LazyLock;

use regex::Regex;

use super::checklist::{parse_checklist, status_is_not_started};
use super::types::WorkItem;

/// Token written into the status cell of a successfully processed row.
pub const COMPLETED_TOKEN: &str = "Completed";

static NOT_STARTED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)not started").expect("status token regex should be valid"));

/// Index of the status cell within a row's `|`-separated segments. Data rows
/// start with a pipe, so segment 0 is the text before it and the status
/// column (fifth data cell) is segment 5.
const STATUS_SEGMENT: usize = 5;

/// Result of applying status updates to a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchOutcome {
    /// The rewritten document text.
    pub document: String,
    /// Ids whose status cell was flipped to completed.
    pub updated: Vec<String>,
    /// Ids with no matching not-started row in the current document.
    pub skipped: Vec<String>,
}

/// Flip the status cell of each successful item's row to [`COMPLETED_TOKEN`].
///
/// Rows are matched by id against a fresh parse of `document`; when the same
/// id appears on several not-started rows, each update consumes the first
/// unconsumed occurrence in document order. The document is only ever moved
/// forward: failed items are not written at all.
pub fn apply_status_updates(document: &str, succeeded: &[WorkItem]) -> PatchOutcome {
    let mut candidates: BTreeMap<String, VecDeque<usize>> = BTreeMap::new();
    for row in parse_checklist(document) {
        if status_is_not_started(&row.status) {
            candidates.entry(row.id).or_default().push_back(row.line);
        }
    }

    // split_inclusive keeps the original line terminators so the rewrite is
    // byte-identical outside patched cells.
    let mut lines: Vec<String> = document.split_inclusive('\n').map(String::from).collect();
    let mut updated = Vec::new();
    let mut skipped = Vec::new();

    for item in succeeded {
        let line_no = candidates
            .get_mut(&item.id)
            .and_then(VecDeque::pop_front);
        let patched = line_no.and_then(|n| {
            lines
                .get(n - 1)
                .and_then(|line| patch_status_cell(line))
                .map(|new_line| (n, new_line))
        });
        match patched {
            Some((n, new_line)) => {
                lines[n - 1] = new_line;
                updated.push(item.id.clone());
            }
            None => skipped.push(item.id.clone()),
        }
    }

    PatchOutcome {
        document: lines.concat(),
        updated,
        skipped,
    }
}

/// Replace the not-started token inside the status cell only.
///
/// Returns `None` when the row has too few cells or its status cell carries
/// no not-started token.
fn patch_status_cell(line: &str) -> Option<String> {
    let mut segments: Vec<&str> = line.split('|').collect();
    if segments.len() <= STATUS_SEGMENT {
        return None;
    }
    let cell = segments[STATUS_SEGMENT];
    let replaced = NOT_STARTED_RE.replace(cell, COMPLETED_TOKEN);
    if replaced == cell {
        return None;
    }
    let replaced = replaced.into_owned();
    segments[STATUS_SEGMENT] = &replaced;
    Some(segments.join("|"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::checklist::parse_checklist;

    const DOC: &str = "\
## Tier 1

### Section

| ID | Target | Priority | Risk | Status |
|----|--------|----------|------|--------|
| SEC-001 | Validate request bodies | P1 | High | Not Started |
| SEC-002 | Sanitize file paths | P1 | High | Not Started |

Trailing prose stays put.
";

    fn item(id: &str) -> WorkItem {
        parse_checklist(DOC)
            .into_iter()
            .find(|row| row.id == id)
            .expect("item in fixture")
    }

    #[test]
    fn patches_only_the_matched_status_cell() {
        let outcome = apply_status_updates(DOC, &[item("SEC-001")]);

        assert_eq!(outcome.updated, vec!["SEC-001"]);
        assert!(outcome.skipped.is_empty());
        assert!(
            outcome
                .document
                .contains("| SEC-001 | Validate request bodies | P1 | High | Completed |")
        );
        // Byte-for-byte identical outside the patched cell.
        let expected = DOC.replace(
            "| SEC-001 | Validate request bodies | P1 | High | Not Started |",
            "| SEC-001 | Validate request bodies | P1 | High | Completed |",
        );
        assert_eq!(outcome.document, expected);
    }

    #[test]
    fn unmatched_id_is_skipped_not_fatal() {
        let mut ghost = item("SEC-001");
        ghost.id = "SEC-999".to_string();

        let outcome = apply_status_updates(DOC, &[ghost]);
        assert!(outcome.updated.is_empty());
        assert_eq!(outcome.skipped, vec!["SEC-999"]);
        assert_eq!(outcome.document, DOC);
    }

    #[test]
    fn already_completed_row_is_skipped() {
        let first = apply_status_updates(DOC, &[item("SEC-002")]);
        let second = apply_status_updates(&first.document, &[item("SEC-002")]);

        assert_eq!(second.skipped, vec!["SEC-002"]);
        assert_eq!(second.document, first.document);
    }

    #[test]
    fn duplicate_rows_are_consumed_in_document_order() {
        let doc = "\
| ID | Target | Priority | Risk | Status |
|----|--------|----------|------|--------|
| DUP-1 | first | P1 | High | Not Started |
| DUP-1 | second | P1 | High | Not Started |
";
        let rows = parse_checklist(doc);
        let outcome = apply_status_updates(doc, &[rows[0].clone()]);

        assert!(outcome.document.contains("| DUP-1 | first | P1 | High | Completed |"));
        assert!(outcome.document.contains("| DUP-1 | second | P1 | High | Not Started |"));
    }

    #[test]
    fn preserves_token_decorations_and_padding() {
        let doc = "\
| ID | Target | Priority | Risk | Status |
|----|--------|----------|------|--------|
| SEC-007 | Review deps |  P2  | Med |  ⬜ not started  |
";
        let rows = parse_checklist(doc);
        let outcome = apply_status_updates(doc, &rows);

        assert!(
            outcome
                .document
                .contains("| SEC-007 | Review deps |  P2  | Med |  ⬜ Completed  |")
        );
    }

    #[test]
    fn preserves_crlf_line_endings() {
        let doc = "| ID | Target | Priority | Risk | Status |\r\n\
|----|--------|----------|------|--------|\r\n\
| SEC-001 | target | P1 | High | Not Started |\r\n";
        let rows = parse_checklist(doc);
        let outcome = apply_status_updates(doc, &rows);

        assert!(outcome.document.contains("| Completed |\r\n"));
        assert_eq!(outcome.document.matches("\r\n").count(), 3);
    }
}
