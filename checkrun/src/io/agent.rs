//! Agent invocation seam.
//!
//! The [`AgentRunner`] trait decouples batch scheduling from the actual agent
//! backend. Tests use scripted runners that return predetermined outcomes
//! without spawning processes; the live [`CommandAgent`] spawns one external
//! process per item.

use std::process::Command;

use tracing::{info, instrument, warn};

use crate::core::types::{FailureReason, RunResult, WorkItem};
use crate::io::config::OrchestratorConfig;
use crate::io::paths::WorkPaths;
use crate::io::process::run_tee_command;

/// Abstraction over agent execution backends.
///
/// `Sync` because batch dispatch shares one runner across worker threads.
pub trait AgentRunner: Sync {
    /// Execute one item with the given rendered prompt and classify the
    /// outcome. Per-item failures are values, never errors.
    fn run(&self, item: &WorkItem, prompt: &str) -> RunResult;
}

/// Live runner that spawns the configured agent command per item.
pub struct CommandAgent {
    command: Vec<String>,
    marker: String,
    output_limit_bytes: usize,
    paths: WorkPaths,
}

impl CommandAgent {
    pub fn new(cfg: &OrchestratorConfig, paths: WorkPaths) -> Self {
        Self {
            command: cfg.agent_command.clone(),
            marker: cfg.completion_marker.clone(),
            output_limit_bytes: cfg.output_limit_bytes,
            paths,
        }
    }
}

impl AgentRunner for CommandAgent {
    #[instrument(skip_all, fields(item = %item.id))]
    fn run(&self, item: &WorkItem, prompt: &str) -> RunResult {
        let log_path = self.paths.log_path(&item.id);
        let mut cmd = Command::new(&self.command[0]);
        cmd.args(&self.command[1..]);

        let capture = match run_tee_command(
            cmd,
            prompt.as_bytes(),
            self.output_limit_bytes,
            &log_path,
        ) {
            Ok(capture) => capture,
            Err(err) => {
                warn!(err = %format!("{err:#}"), "agent could not be launched");
                return RunResult::failed(
                    item.clone(),
                    FailureReason::Spawn {
                        message: format!("{err:#}"),
                    },
                    String::new(),
                );
            }
        };

        let combined = capture.combined();
        // A non-zero exit fails the item even when the marker is present:
        // success requires exit 0 and the marker simultaneously.
        if !capture.status.success() {
            warn!(exit_code = ?capture.status.code(), "agent exited non-zero");
            return RunResult::failed(
                item.clone(),
                FailureReason::Exit {
                    code: capture.status.code(),
                },
                combined,
            );
        }
        if !combined.contains(&self.marker) {
            warn!("agent exited cleanly without printing the completion marker");
            return RunResult::failed(item.clone(), FailureReason::MarkerMissing, combined);
        }

        info!("item completed");
        RunResult::success(item.clone(), combined)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::test_support::item_with_status;

    fn agent_for(temp: &tempfile::TempDir, script: &str) -> CommandAgent {
        let cfg = OrchestratorConfig {
            agent_command: vec!["sh".to_string(), "-c".to_string(), script.to_string()],
            completion_marker: "CHECKLIST ITEM COMPLETE".to_string(),
            ..OrchestratorConfig::default()
        };
        CommandAgent::new(&cfg, WorkPaths::new(temp.path()))
    }

    #[test]
    fn clean_exit_with_marker_succeeds() {
        let temp = tempfile::tempdir().expect("tempdir");
        let agent = agent_for(&temp, "echo 'work done'; echo 'CHECKLIST ITEM COMPLETE'");
        let item = item_with_status("SEC-001", "Not Started");

        let result = agent.run(&item, "prompt");
        assert!(result.succeeded());
        assert!(result.output.contains("work done"));
    }

    #[test]
    fn marker_on_stderr_also_counts() {
        let temp = tempfile::tempdir().expect("tempdir");
        let agent = agent_for(&temp, "echo 'CHECKLIST ITEM COMPLETE' >&2");
        let item = item_with_status("SEC-001", "Not Started");

        assert!(agent.run(&item, "prompt").succeeded());
    }

    #[test]
    fn marker_match_is_case_sensitive() {
        let temp = tempfile::tempdir().expect("tempdir");
        let agent = agent_for(&temp, "echo 'checklist item complete'");
        let item = item_with_status("SEC-001", "Not Started");

        let result = agent.run(&item, "prompt");
        assert_eq!(result.failure, Some(FailureReason::MarkerMissing));
    }

    #[test]
    fn clean_exit_without_marker_fails_with_marker_reason() {
        let temp = tempfile::tempdir().expect("tempdir");
        let agent = agent_for(&temp, "echo 'did some work, forgot to say so'");
        let item = item_with_status("SEC-001", "Not Started");

        let result = agent.run(&item, "prompt");
        let reason = result.failure.expect("failure");
        assert_eq!(reason.to_string(), "completion marker not detected");
    }

    #[test]
    fn nonzero_exit_fails_even_with_marker_present() {
        let temp = tempfile::tempdir().expect("tempdir");
        let agent = agent_for(&temp, "echo 'CHECKLIST ITEM COMPLETE'; exit 3");
        let item = item_with_status("SEC-001", "Not Started");

        let result = agent.run(&item, "prompt");
        assert_eq!(result.failure, Some(FailureReason::Exit { code: Some(3) }));
        assert_eq!(
            result.failure.expect("failure").to_string(),
            "exit code 3"
        );
    }

    #[test]
    fn unlaunchable_command_fails_with_spawn_reason() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = OrchestratorConfig {
            agent_command: vec!["definitely-not-a-real-program-xyz".to_string()],
            ..OrchestratorConfig::default()
        };
        let agent = CommandAgent::new(&cfg, WorkPaths::new(temp.path()));
        let item = item_with_status("SEC-001", "Not Started");

        let result = agent.run(&item, "prompt");
        assert!(matches!(result.failure, Some(FailureReason::Spawn { .. })));
    }

    #[test]
    fn prompt_is_delivered_on_stdin() {
        let temp = tempfile::tempdir().expect("tempdir");
        let agent = agent_for(&temp, "cat; echo 'CHECKLIST ITEM COMPLETE'");
        let item = item_with_status("SEC-001", "Not Started");

        let result = agent.run(&item, "the rendered prompt");
        assert!(result.succeeded());
        assert!(result.output.contains("the rendered prompt"));
    }

    #[test]
    fn writes_one_log_file_per_item() {
        let temp = tempfile::tempdir().expect("tempdir");
        let agent = agent_for(&temp, "echo 'CHECKLIST ITEM COMPLETE'");
        let paths = WorkPaths::new(temp.path());
        let item = item_with_status("SEC-001", "Not Started");

        agent.run(&item, "prompt");
        assert!(paths.log_path("SEC-001").is_file());
    }
}
