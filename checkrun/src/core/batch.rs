//! Pending-item selection and fixed-size batch partitioning.
//!
//! Pure logic: the document's status text decides eligibility, and a resumed
//! run additionally excludes ids the processor state already recorded. Both
//! steps preserve document order.

use std::collections::BTreeSet;

use super::checklist::status_is_not_started;
use super::types::WorkItem;

/// Filter items down to those eligible for dispatch.
///
/// An item is pending when its document status reads "not started". When
/// `processed` is given (a resumed run), ids already recorded as completed or
/// failed are excluded as well, so no processed id is ever re-dispatched.
pub fn pending_items(items: &[WorkItem], processed: Option<&BTreeSet<String>>) -> Vec<WorkItem> {
    items
        .iter()
        .filter(|item| status_is_not_started(&item.status))
        .filter(|item| processed.is_none_or(|done| !done.contains(&item.id)))
        .cloned()
        .collect()
}

/// Split pending items into consecutive groups of at most `batch_size`.
pub fn partition(items: &[WorkItem], batch_size: usize) -> Vec<Vec<WorkItem>> {
    debug_assert!(batch_size > 0, "batch_size is validated at the CLI boundary");
    items
        .chunks(batch_size.max(1))
        .map(<[WorkItem]>::to_vec)
        .collect()
}
