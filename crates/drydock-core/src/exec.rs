//! External command execution.
//!
//! Every stage of the pipeline shells out through the [`CommandRunner`]
//! trait: [`ProcessRunner`] spawns real subprocesses, while
//! [`RecordingRunner`] replays scripted results for deterministic tests
//! without touching the filesystem or network.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncReadExt;
use tokio::process::Command;

use crate::error::ExecError;

/// Ceiling on subprocess runtime. A hung command must never block the
/// pipeline indefinitely.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Exit code synthesized when a command is killed on timeout.
pub const TIMEOUT_EXIT_CODE: i32 = -1;

/// Result of one external command execution.
#[derive(Debug, Clone)]
pub struct ExecResult {
    /// Exit code (0 = success, -1 = killed on timeout).
    pub exit_code: i32,

    /// Combined stdout/stderr transcript, decoded as UTF-8.
    pub output: String,
}

impl ExecResult {
    /// Whether the command exited cleanly.
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Executes an external command in a working directory.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `command` inside `work_dir` and capture its combined output.
    ///
    /// Returns `Err` only when the command could not run at all; a
    /// command that ran and exited non-zero is an ordinary
    /// [`ExecResult`].
    async fn run(&self, command: &[String], work_dir: &Path) -> Result<ExecResult, ExecError>;
}

/// Real subprocess runner with a hard timeout ceiling.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    timeout: Duration,
}

impl ProcessRunner {
    /// Runner with the default five-minute ceiling.
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// Runner with a custom ceiling (shortened in tests).
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, command: &[String], work_dir: &Path) -> Result<ExecResult, ExecError> {
        let (exe, args) = command.split_first().ok_or(ExecError::EmptyCommand)?;
        if !work_dir.is_dir() {
            return Err(ExecError::MissingWorkDir(work_dir.to_path_buf()));
        }

        let mut child = Command::new(exe)
            .args(args)
            .current_dir(work_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ExecError::Spawn {
                command: exe.clone(),
                source,
            })?;

        // Drain both pipes on a separate task so the partial transcript
        // survives a timeout kill, and so a child blocked on a full
        // pipe cannot deadlock against our wait().
        let stdout_pipe = child.stdout.take();
        let stderr_pipe = child.stderr.take();
        let reader = tokio::spawn(async move {
            let mut out = Vec::new();
            let mut err = Vec::new();
            let drain_out = async {
                if let Some(mut pipe) = stdout_pipe {
                    let _ = pipe.read_to_end(&mut out).await;
                }
            };
            let drain_err = async {
                if let Some(mut pipe) = stderr_pipe {
                    let _ = pipe.read_to_end(&mut err).await;
                }
            };
            tokio::join!(drain_out, drain_err);
            (out, err)
        });

        match tokio::time::timeout(self.timeout, child.wait()).await {
            Ok(status) => {
                let status = status?;
                let (out, err) = reader.await.map_err(std::io::Error::other)?;
                Ok(ExecResult {
                    exit_code: status.code().unwrap_or(TIMEOUT_EXIT_CODE),
                    output: merge_streams(&out, &err),
                })
            }
            Err(_) => {
                tracing::warn!(command = %exe, timeout_secs = self.timeout.as_secs(), "command timed out, killing");
                child.kill().await?;
                let (out, err) = reader.await.map_err(std::io::Error::other)?;
                Ok(ExecResult {
                    exit_code: TIMEOUT_EXIT_CODE,
                    output: format!("Process timed out. Output:\n{}", merge_streams(&out, &err)),
                })
            }
        }
    }
}

/// Combine the captured streams into one transcript, stdout first.
fn merge_streams(stdout: &[u8], stderr: &[u8]) -> String {
    let mut merged = String::from_utf8_lossy(stdout).into_owned();
    if !stderr.is_empty() {
        if !merged.is_empty() && !merged.ends_with('\n') {
            merged.push('\n');
        }
        merged.push_str(&String::from_utf8_lossy(stderr));
    }
    merged
}

/// One invocation observed by [`RecordingRunner`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub command: Vec<String>,
    pub work_dir: PathBuf,
}

#[derive(Debug)]
enum Scripted {
    Result(ExecResult),
    SpawnFailure(String),
}

/// Scripted runner that records every call instead of spawning.
///
/// Results are served in FIFO order; once the script is exhausted every
/// call succeeds with exit code 0 and empty output.
#[derive(Debug, Default)]
pub struct RecordingRunner {
    script: Mutex<VecDeque<Scripted>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a result for the next call.
    pub fn push_result(&self, exit_code: i32, output: &str) {
        self.script
            .lock()
            .unwrap()
            .push_back(Scripted::Result(ExecResult {
                exit_code,
                output: output.to_string(),
            }));
    }

    /// Queue a spawn failure (missing executable) for the next call.
    pub fn push_spawn_failure(&self, message: &str) {
        self.script
            .lock()
            .unwrap()
            .push_back(Scripted::SpawnFailure(message.to_string()));
    }

    /// All invocations observed so far.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandRunner for RecordingRunner {
    async fn run(&self, command: &[String], work_dir: &Path) -> Result<ExecResult, ExecError> {
        let exe = command.first().ok_or(ExecError::EmptyCommand)?.clone();
        self.calls.lock().unwrap().push(RecordedCall {
            command: command.to_vec(),
            work_dir: work_dir.to_path_buf(),
        });
        match self.script.lock().unwrap().pop_front() {
            Some(Scripted::Result(result)) => Ok(result),
            Some(Scripted::SpawnFailure(message)) => Err(ExecError::Spawn {
                command: exe,
                source: std::io::Error::new(std::io::ErrorKind::NotFound, message),
            }),
            None => Ok(ExecResult {
                exit_code: 0,
                output: String::new(),
            }),
        }
    }
}
