//! Checkpoint snapshots of document-visible status (`.checkrun/checkpoint.json`).
//!
//! Written after each batch for audit and diagnostics. No history is retained:
//! each write replaces the previous checkpoint.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::core::types::WorkItem;

/// Point-in-time snapshot of every item's document status.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Checkpoint {
    pub timestamp: String,
    pub items: Vec<CheckpointItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckpointItem {
    pub id: String,
    pub status: String,
}

impl Checkpoint {
    /// Snapshot the given items as of now.
    pub fn capture(items: &[WorkItem]) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            items: items
                .iter()
                .map(|item| CheckpointItem {
                    id: item.id.clone(),
                    status: item.status.clone(),
                })
                .collect(),
        }
    }
}

/// Overwrite the checkpoint file with a fresh snapshot.
pub fn write_checkpoint(path: &Path, checkpoint: &Checkpoint) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create checkpoint dir {}", parent.display()))?;
    }
    let mut buf = serde_json::to_string_pretty(checkpoint)?;
    buf.push('\n');
    fs::write(path, buf).with_context(|| format!("write checkpoint {}", path.display()))
}

/// Read the latest checkpoint, if one exists.
pub fn load_checkpoint(path: &Path) -> Result<Option<Checkpoint>> {
    if !path.exists() {
        return Ok(None);
    }
    let contents =
        fs::read_to_string(path).with_context(|| format!("read checkpoint {}", path.display()))?;
    let checkpoint = serde_json::from_str(&contents)
        .with_context(|| format!("parse checkpoint {}", path.display()))?;
    Ok(Some(checkpoint))
}
