//! Repository acquisition into isolated build workspaces.
//!
//! Each pipeline run gets one directory under the base dir, keyed by
//! commit SHA. Anything already sitting at that path is treated as
//! leftover state from a crashed run and purged before cloning.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::ExecError;
use crate::exec::{CommandRunner, ExecResult};

/// Outcome of cloning a repository and checking out a commit.
///
/// A failed git command is an ordinary outcome with `success == false`,
/// not an error; the orchestrator turns it into a reported failure.
#[derive(Debug, Clone)]
pub struct CloneOutcome {
    /// Exit code of the last git command that ran.
    pub exit_code: i32,

    /// Combined output of that command.
    pub output: String,

    /// Whether clone and checkout both succeeded.
    pub success: bool,

    /// Directory the repository was cloned into.
    pub workspace: PathBuf,
}

impl CloneOutcome {
    fn from_exec(result: ExecResult, workspace: PathBuf) -> Self {
        Self {
            success: result.success(),
            exit_code: result.exit_code,
            output: result.output,
            workspace,
        }
    }
}

/// Clones repositories into per-commit workspaces and removes them.
pub struct WorkspaceManager {
    runner: Arc<dyn CommandRunner>,
    base_dir: PathBuf,
}

impl WorkspaceManager {
    pub fn new(runner: Arc<dyn CommandRunner>, base_dir: PathBuf) -> Self {
        Self { runner, base_dir }
    }

    /// Deterministic workspace location for a commit.
    pub fn workspace_path(&self, commit_sha: &str) -> PathBuf {
        self.base_dir.join(commit_sha)
    }

    /// Clone `branch` of `clone_url` and check out `commit_sha`.
    ///
    /// The clone is shallow and single-branch; the directory is named
    /// after the commit SHA. When the clone command fails no checkout
    /// is attempted and its failed result is returned as-is.
    pub async fn clone_and_checkout(
        &self,
        clone_url: &str,
        branch: &str,
        commit_sha: &str,
    ) -> Result<CloneOutcome, ExecError> {
        let workspace = self.workspace_path(commit_sha);

        tokio::fs::create_dir_all(&self.base_dir).await?;

        // Leftover state at the target path is stale or corrupted.
        if tokio::fs::try_exists(&workspace).await? {
            warn!(workspace = %workspace.display(), "purging stale workspace");
            tokio::fs::remove_dir_all(&workspace).await?;
        }

        let clone_command: Vec<String> = [
            "git",
            "clone",
            "--depth",
            "1",
            "--branch",
            branch,
            "--single-branch",
            clone_url,
            commit_sha,
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        let clone_result = self.runner.run(&clone_command, &self.base_dir).await?;
        if !clone_result.success() {
            return Ok(CloneOutcome::from_exec(clone_result, workspace));
        }

        let checkout_command: Vec<String> = ["git", "checkout", commit_sha]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let checkout_result = self.runner.run(&checkout_command, &workspace).await?;
        Ok(CloneOutcome::from_exec(checkout_result, workspace))
    }

    /// Remove a workspace recursively. Best-effort: failures are logged
    /// as warnings and never fail the pipeline.
    pub async fn cleanup(&self, workspace: &Path) {
        match tokio::fs::remove_dir_all(workspace).await {
            Ok(()) => debug!(workspace = %workspace.display(), "workspace removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!(workspace = %workspace.display(), error = %e, "failed to clean up workspace")
            }
        }
    }
}
