//! Bounded-concurrency checklist batch orchestrator.
//!
//! Reads work items from a markdown checklist, groups pending items into
//! fixed-size batches, executes each item by delegating to an external agent
//! process, detects completion via an exact sentinel marker in the process
//! output, persists resumable progress, and writes completion status back to
//! the document. The architecture enforces a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (parsing, batching, document
//!   patching). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (filesystem, process execution,
//!   state persistence). Isolated to enable scripted doubles in tests.
//!
//! [`scheduler`] coordinates core logic with I/O; [`status`] implements the
//! read-only progress command.

pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod scheduler;
pub mod status;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
