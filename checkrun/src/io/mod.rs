//! I/O helpers for orchestrator commands.

pub mod agent;
pub mod checkpoint;
pub mod config;
pub mod paths;
pub mod process;
pub mod prompt;
pub mod state_store;
