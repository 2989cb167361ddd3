//! Orchestrator configuration stored under `.checkrun/config.toml`.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

/// Orchestrator configuration (TOML).
///
/// This file is intended to be edited by humans and must remain stable and
/// automatable. Missing fields default to sensible values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Agent command to spawn per item (program followed by fixed arguments).
    /// The rendered prompt is written to the process's stdin, never passed as
    /// an argument, so prompt size is not bounded by argv limits.
    pub agent_command: Vec<String>,

    /// Exact, case-sensitive token the agent must print (on stdout or stderr)
    /// to signal genuine completion of its item.
    pub completion_marker: String,

    /// Fixed pause between batches, in seconds. A simple throttle, not
    /// adaptive backoff.
    pub pause_between_batches_secs: u64,

    /// Bound on the per-item output kept in memory for marker detection.
    /// The per-item log file always receives the full streams.
    pub output_limit_bytes: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            agent_command: vec![
                "claude".to_string(),
                "-p".to_string(),
                "--dangerously-skip-permissions".to_string(),
            ],
            completion_marker: "CHECKLIST ITEM COMPLETE".to_string(),
            pause_between_batches_secs: 5,
            output_limit_bytes: 200_000,
        }
    }
}

impl OrchestratorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.agent_command.is_empty() || self.agent_command[0].trim().is_empty() {
            return Err(anyhow!("agent_command must be a non-empty array"));
        }
        if self.completion_marker.trim().is_empty() {
            return Err(anyhow!("completion_marker must not be empty"));
        }
        if self.completion_marker != self.completion_marker.trim() {
            return Err(anyhow!(
                "completion_marker must not carry leading or trailing whitespace"
            ));
        }
        if self.output_limit_bytes == 0 {
            return Err(anyhow!("output_limit_bytes must be > 0"));
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `OrchestratorConfig::default()`.
pub fn load_config(path: &Path) -> Result<OrchestratorConfig> {
    if !path.exists() {
        let cfg = OrchestratorConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: OrchestratorConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &OrchestratorConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, OrchestratorConfig::default());
    }

    #[test]
    fn write_then_load_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        let cfg = OrchestratorConfig {
            agent_command: vec!["sh".to_string(), "-c".to_string(), "true".to_string()],
            completion_marker: "DONE".to_string(),
            pause_between_batches_secs: 0,
            output_limit_bytes: 1024,
        };
        write_config(&path, &cfg).expect("write");
        let loaded = load_config(&path).expect("load");
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn rejects_empty_command_and_padded_marker() {
        let mut cfg = OrchestratorConfig::default();
        cfg.agent_command.clear();
        assert!(cfg.validate().is_err());

        let cfg = OrchestratorConfig {
            completion_marker: " DONE ".to_string(),
            ..OrchestratorConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "completion_marker = \"ALL DONE\"\n").expect("write");

        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.completion_marker, "ALL DONE");
        assert_eq!(
            cfg.pause_between_batches_secs,
            OrchestratorConfig::default().pause_between_batches_secs
        );
    }
}
