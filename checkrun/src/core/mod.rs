//! Deterministic, pure logic shared by the orchestrator core.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests.

pub mod batch;
pub mod checklist;
pub mod status_update;
pub mod types;
