//! Stable exit codes for the orchestrator CLI.

/// Run finished normally (even when some items failed) or status was printed.
pub const OK: i32 = 0;
/// Fatal configuration or parse error: bad flags, missing checklist, invalid
/// config file. No work was started.
pub const INVALID: i32 = 1;
