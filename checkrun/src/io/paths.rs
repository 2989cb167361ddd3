//! Resolved locations for orchestrator working files.
//!
//! Every component receives a [`WorkPaths`] instead of assuming the process
//! working directory. All state lives under `.checkrun/` next to the
//! checklist document.

use std::path::{Path, PathBuf};

/// Resolved paths for the working subdirectory.
#[derive(Debug, Clone)]
pub struct WorkPaths {
    pub dir: PathBuf,
    pub state_path: PathBuf,
    pub checkpoint_path: PathBuf,
    pub config_path: PathBuf,
    pub template_path: PathBuf,
    pub logs_dir: PathBuf,
}

impl WorkPaths {
    pub fn new(root: &Path) -> Self {
        let dir = root.join(".checkrun");
        Self {
            state_path: dir.join("state.json"),
            checkpoint_path: dir.join("checkpoint.json"),
            config_path: dir.join("config.toml"),
            template_path: dir.join("prompt.md"),
            logs_dir: dir.join("logs"),
            dir,
        }
    }

    /// Per-item log file path, one per item id.
    pub fn log_path(&self, item_id: &str) -> PathBuf {
        self.logs_dir.join(format!("{}.log", sanitize_id(item_id)))
    }
}

/// Restrict an item id to filename-safe characters.
fn sanitize_id(id: &str) -> String {
    let cleaned: String = id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '-'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "item".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_rooted_under_workdir() {
        let paths = WorkPaths::new(Path::new("/work"));
        assert!(paths.state_path.ends_with(".checkrun/state.json"));
        assert!(paths.checkpoint_path.ends_with(".checkrun/checkpoint.json"));
        assert!(paths.config_path.ends_with(".checkrun/config.toml"));
        assert!(paths.template_path.ends_with(".checkrun/prompt.md"));
        assert!(paths.logs_dir.ends_with(".checkrun/logs"));
    }

    #[test]
    fn log_path_sanitizes_item_ids() {
        let paths = WorkPaths::new(Path::new("/work"));
        assert!(paths.log_path("SEC-001").ends_with("logs/SEC-001.log"));
        assert!(paths.log_path("a/b c").ends_with("logs/a-b-c.log"));
        assert!(paths.log_path("").ends_with("logs/item.log"));
    }
}
