//! Helpers for running agent child processes with bounded, teed output.
//!
//! Each stream is drained on its own thread so the child can never block on a
//! full pipe. Both streams are teed to a shared per-item log file as they
//! arrive and accumulated (up to a byte limit) in memory for completion
//! marker detection. No timeout is enforced here: any time bound belongs to
//! the agent process itself.

use std::fs::File;
use std::io::{BufRead, BufReader, Read, Write};
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};
use std::sync::{Arc, Mutex};
use std::thread;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, instrument, warn};

/// Captured child process output.
#[derive(Debug)]
pub struct CommandCapture {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub stdout_truncated: usize,
    pub stderr_truncated: usize,
}

impl CommandCapture {
    /// Combined stdout and stderr as text, for marker detection.
    pub fn combined(&self) -> String {
        let mut buf = String::from_utf8_lossy(&self.stdout).into_owned();
        buf.push_str(&String::from_utf8_lossy(&self.stderr));
        buf
    }
}

/// Run a command, feeding `stdin` to the child and teeing both output streams
/// to `log_path` while accumulating up to `output_limit_bytes` of each stream
/// in memory.
///
/// The log file is truncated at the start of the attempt and then appended as
/// output arrives; it always receives the full streams regardless of the
/// in-memory limit.
#[instrument(skip_all, fields(log = %log_path.display(), output_limit_bytes))]
pub fn run_tee_command(
    mut cmd: Command,
    stdin: &[u8],
    output_limit_bytes: usize,
    log_path: &Path,
) -> Result<CommandCapture> {
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create log dir {}", parent.display()))?;
    }
    let log_file = File::create(log_path)
        .with_context(|| format!("create item log {}", log_path.display()))?;
    let log_file = Arc::new(Mutex::new(log_file));

    cmd.stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    debug!("spawning agent process");
    let mut child = cmd.spawn().context("spawn agent command")?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("stdout was not piped"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow!("stderr was not piped"))?;

    // Drain both streams before feeding stdin so a chatty child can never
    // deadlock against a full pipe.
    let stdout_log = Arc::clone(&log_file);
    let stdout_handle =
        thread::spawn(move || read_tee_limited(stdout, output_limit_bytes, &stdout_log));
    let stderr_log = Arc::clone(&log_file);
    let stderr_handle =
        thread::spawn(move || read_tee_limited(stderr, output_limit_bytes, &stderr_log));

    let mut child_stdin = child
        .stdin
        .take()
        .ok_or_else(|| anyhow!("stdin was not piped"))?;
    if let Err(err) = child_stdin.write_all(stdin) {
        // A child that exits before consuming its prompt surfaces here as a
        // broken pipe; classification happens on the exit status instead.
        warn!(err = %err, "failed to write prompt to agent stdin");
    }
    drop(child_stdin);

    let status = child.wait().context("wait for agent command")?;
    let (stdout, stdout_truncated) = join_output(stdout_handle).context("join stdout")?;
    let (stderr, stderr_truncated) = join_output(stderr_handle).context("join stderr")?;

    if stdout_truncated > 0 || stderr_truncated > 0 {
        warn!(stdout_truncated, stderr_truncated, "in-memory capture truncated");
    }

    debug!(exit_code = ?status.code(), "agent command finished");
    Ok(CommandCapture {
        status,
        stdout,
        stderr,
        stdout_truncated,
        stderr_truncated,
    })
}

fn join_output(handle: thread::JoinHandle<Result<(Vec<u8>, usize)>>) -> Result<(Vec<u8>, usize)> {
    match handle.join() {
        Ok(result) => result,
        Err(_) => Err(anyhow!("output reader thread panicked")),
    }
}

/// Read a stream line-wise, teeing every line to the shared log file and
/// collecting up to `limit` bytes in memory.
fn read_tee_limited<R: Read>(
    reader: R,
    limit: usize,
    log_file: &Mutex<File>,
) -> Result<(Vec<u8>, usize)> {
    let mut buf_reader = BufReader::new(reader);
    let mut collected = Vec::new();
    let mut truncated = 0usize;

    loop {
        let mut line = Vec::new();
        let n = buf_reader
            .read_until(b'\n', &mut line)
            .context("read agent output")?;
        if n == 0 {
            break;
        }

        if let Ok(mut file) = log_file.lock() {
            if let Err(err) = file.write_all(&line) {
                warn!(err = %err, "failed to append to item log");
            } else if let Err(err) = file.flush() {
                warn!(err = %err, "failed to flush item log");
            }
        }

        let remaining = limit.saturating_sub(collected.len());
        if remaining > 0 {
            let keep = n.min(remaining);
            collected.extend_from_slice(&line[..keep]);
            truncated += n.saturating_sub(keep);
        } else {
            truncated += n;
        }
    }

    Ok((collected, truncated))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;

    fn sh(script: &str) -> Command {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(script);
        cmd
    }

    #[test]
    fn captures_both_streams_and_tees_to_log() {
        let temp = tempfile::tempdir().expect("tempdir");
        let log_path = temp.path().join("item.log");

        let capture = run_tee_command(
            sh("echo out; echo err >&2"),
            b"",
            10_000,
            &log_path,
        )
        .expect("run");

        assert!(capture.status.success());
        assert_eq!(String::from_utf8_lossy(&capture.stdout), "out\n");
        assert_eq!(String::from_utf8_lossy(&capture.stderr), "err\n");

        let log = fs::read_to_string(&log_path).expect("read log");
        assert!(log.contains("out"));
        assert!(log.contains("err"));
    }

    #[test]
    fn stdin_reaches_the_child() {
        let temp = tempfile::tempdir().expect("tempdir");
        let capture = run_tee_command(
            sh("cat"),
            b"prompt body\n",
            10_000,
            &temp.path().join("item.log"),
        )
        .expect("run");

        assert_eq!(String::from_utf8_lossy(&capture.stdout), "prompt body\n");
    }

    #[test]
    fn memory_capture_is_bounded_but_log_is_complete() {
        let temp = tempfile::tempdir().expect("tempdir");
        let log_path = temp.path().join("item.log");

        let capture = run_tee_command(
            sh("printf 'aaaaaaaaaa\\nbbbbbbbbbb\\n'"),
            b"",
            8,
            &log_path,
        )
        .expect("run");

        assert_eq!(capture.stdout.len(), 8);
        assert!(capture.stdout_truncated > 0);
        let log = fs::read_to_string(&log_path).expect("read log");
        assert_eq!(log, "aaaaaaaaaa\nbbbbbbbbbb\n");
    }

    #[test]
    fn nonzero_exit_is_reported_in_status() {
        let temp = tempfile::tempdir().expect("tempdir");
        let capture = run_tee_command(sh("exit 7"), b"", 1_000, &temp.path().join("item.log"))
            .expect("run");
        assert_eq!(capture.status.code(), Some(7));
    }

    #[test]
    fn missing_program_fails_to_spawn() {
        let temp = tempfile::tempdir().expect("tempdir");
        let err = run_tee_command(
            Command::new("definitely-not-a-real-program-xyz"),
            b"",
            1_000,
            &temp.path().join("item.log"),
        )
        .unwrap_err();
        assert!(format!("{err:#}").contains("spawn agent command"));
    }

    #[test]
    fn log_is_truncated_at_attempt_start() {
        let temp = tempfile::tempdir().expect("tempdir");
        let log_path = temp.path().join("item.log");
        fs::write(&log_path, "stale contents from a previous attempt\n").expect("seed log");

        run_tee_command(sh("echo fresh"), b"", 1_000, &log_path).expect("run");

        let log = fs::read_to_string(&log_path).expect("read log");
        assert_eq!(log, "fresh\n");
    }
}
