//! Build and test stage execution.
//!
//! Compile and test share one mechanism: run a configured command list
//! in the acquired workspace and classify any non-zero exit as failure.
//! There is no partial-success state.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ExecError;
use crate::exec::{CommandRunner, ExecResult};

/// Which pipeline stage a command list belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Compile,
    Test,
}

impl StageKind {
    pub fn name(&self) -> &'static str {
        match self {
            StageKind::Compile => "compile",
            StageKind::Test => "test",
        }
    }
}

/// Configuration for one stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageConfig {
    pub kind: StageKind,

    /// Command to execute (first element is the executable).
    pub command: Vec<String>,
}

impl StageConfig {
    pub fn new(kind: StageKind, command: Vec<String>) -> Self {
        Self { kind, command }
    }
}

/// Verdict of one stage execution.
#[derive(Debug, Clone)]
pub struct StageOutcome {
    pub exit_code: i32,
    pub output: String,
    pub success: bool,
}

impl From<ExecResult> for StageOutcome {
    fn from(result: ExecResult) -> Self {
        Self {
            success: result.success(),
            exit_code: result.exit_code,
            output: result.output,
        }
    }
}

/// Run a stage's command in `workspace` via the injected runner.
pub async fn run_stage(
    runner: &dyn CommandRunner,
    config: &StageConfig,
    workspace: &Path,
) -> Result<StageOutcome, ExecError> {
    debug!(stage = config.kind.name(), command = ?config.command, "running stage");
    let result = runner.run(&config.command, workspace).await?;
    Ok(StageOutcome::from(result))
}
