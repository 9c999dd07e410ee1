//! Pipeline orchestration: the state machine driving one build.
//!
//! For one triggering event the pipeline acquires a workspace, compiles,
//! tests, reports a status at each transition, appends a build record,
//! and removes the workspace on every exit path. The caller always gets
//! a definite report back; no error escapes `run`.

use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, warn};

use drydock_store::{BuildLedger, BuildState};

use crate::config::CiConfig;
use crate::event::BuildEvent;
use crate::exec::CommandRunner;
use crate::git::WorkspaceManager;
use crate::notify::{Notifier, StatusState};
use crate::stage::{run_stage, StageConfig};

/// Terminal outcome of one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineOutcome {
    /// Clone and checkout, compile, and tests all passed.
    Success,

    /// The repository could not be cloned or the commit checked out.
    CloneFailed,

    /// The compile stage exited non-zero.
    CompileFailed,

    /// The test stage exited non-zero.
    TestsFailed,

    /// An unexpected internal error aborted the run.
    Errored,
}

/// Summary of one completed pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub commit_sha: String,
    pub outcome: PipelineOutcome,

    /// Id of the appended build record, when one was written.
    pub record_id: Option<String>,

    /// Human-readable description, matching the reported status.
    pub description: String,
}

/// Orchestrates the stages of one build run.
pub struct Pipeline {
    runner: Arc<dyn CommandRunner>,
    workspaces: WorkspaceManager,
    notifier: Arc<dyn Notifier>,
    ledger: Arc<dyn BuildLedger>,
    compile: StageConfig,
    test: StageConfig,
}

impl Pipeline {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        workspaces: WorkspaceManager,
        notifier: Arc<dyn Notifier>,
        ledger: Arc<dyn BuildLedger>,
        compile: StageConfig,
        test: StageConfig,
    ) -> Self {
        Self {
            runner,
            workspaces,
            notifier,
            ledger,
            compile,
            test,
        }
    }

    /// Wire a pipeline from resolved configuration and injected
    /// collaborators.
    pub fn from_config(
        config: &CiConfig,
        runner: Arc<dyn CommandRunner>,
        notifier: Arc<dyn Notifier>,
        ledger: Arc<dyn BuildLedger>,
    ) -> Self {
        let workspaces = WorkspaceManager::new(runner.clone(), config.workspace_dir.clone());
        Self::new(
            runner,
            workspaces,
            notifier,
            ledger,
            config.compile_stage(),
            config.test_stage(),
        )
    }

    /// Run one pipeline to completion.
    ///
    /// Stage failures are ordinary outcomes; unexpected errors are
    /// caught here, reported best-effort as an `error` status, and
    /// folded into the report. The workspace is removed on every exit
    /// path, including a clone that failed partway.
    pub async fn run(&self, event: &BuildEvent) -> PipelineReport {
        info!(
            sha = %event.commit_sha,
            repo = %event.repository_name,
            branch = %event.branch,
            "pipeline started"
        );

        let workspace = self.workspaces.workspace_path(&event.commit_sha);

        let report = match self.run_stages(event).await {
            Ok(report) => report,
            Err(e) => {
                error!(sha = %event.commit_sha, error = %e, "pipeline errored");
                let description = format!("Internal error: {e}");
                self.set_status(event, StatusState::Error, &description).await;
                PipelineReport {
                    commit_sha: event.commit_sha.clone(),
                    outcome: PipelineOutcome::Errored,
                    record_id: None,
                    description,
                }
            }
        };

        self.workspaces.cleanup(&workspace).await;

        info!(
            sha = %event.commit_sha,
            outcome = ?report.outcome,
            "pipeline finished"
        );
        report
    }

    async fn run_stages(&self, event: &BuildEvent) -> anyhow::Result<PipelineReport> {
        self.set_status(event, StatusState::Pending, "Build started")
            .await;

        let clone = self
            .workspaces
            .clone_and_checkout(&event.clone_url, &event.branch, &event.commit_sha)
            .await?;
        if !clone.success {
            warn!(sha = %event.commit_sha, exit_code = clone.exit_code, "clone or checkout failed");
            let description = "Clone or checkout failed";
            self.set_status(event, StatusState::Failure, description)
                .await;
            // No record: there are no compile or test logs yet.
            return Ok(self.report(event, PipelineOutcome::CloneFailed, None, description));
        }

        let compile = run_stage(self.runner.as_ref(), &self.compile, &clone.workspace).await?;
        if !compile.success {
            let description = "Compilation failed";
            self.set_status(event, StatusState::Failure, description)
                .await;
            let record_id = self
                .append_record(event, BuildState::Failure, &compile.output, "")
                .await;
            return Ok(self.report(event, PipelineOutcome::CompileFailed, record_id, description));
        }

        let test = run_stage(self.runner.as_ref(), &self.test, &clone.workspace).await?;
        if !test.success {
            let description = "Tests failed";
            self.set_status(event, StatusState::Failure, description)
                .await;
            let record_id = self
                .append_record(event, BuildState::Failure, &compile.output, &test.output)
                .await;
            return Ok(self.report(event, PipelineOutcome::TestsFailed, record_id, description));
        }

        let description = "Build and tests passed";
        self.set_status(event, StatusState::Success, description)
            .await;
        let record_id = self
            .append_record(event, BuildState::Success, &compile.output, &test.output)
            .await;
        Ok(self.report(event, PipelineOutcome::Success, record_id, description))
    }

    fn report(
        &self,
        event: &BuildEvent,
        outcome: PipelineOutcome,
        record_id: Option<String>,
        description: &str,
    ) -> PipelineReport {
        PipelineReport {
            commit_sha: event.commit_sha.clone(),
            outcome,
            record_id,
            description: description.to_string(),
        }
    }

    /// Deliver a status update. A failed notification is logged and
    /// never masks the build result.
    async fn set_status(&self, event: &BuildEvent, state: StatusState, description: &str) {
        if let Err(e) = self
            .notifier
            .set_status(
                &event.owner_login,
                &event.repository_name,
                &event.commit_sha,
                state,
                description,
            )
            .await
        {
            warn!(sha = %event.commit_sha, error = %e, "status delivery failed");
        }
    }

    /// Append a build record. A persistence failure is logged and does
    /// not roll back the status already reported.
    async fn append_record(
        &self,
        event: &BuildEvent,
        state: BuildState,
        compile_log: &str,
        test_log: &str,
    ) -> Option<String> {
        match self
            .ledger
            .append(&event.commit_sha, state, compile_log, test_log)
            .await
        {
            Ok(id) => Some(id),
            Err(e) => {
                warn!(sha = %event.commit_sha, error = %e, "failed to persist build record");
                None
            }
        }
    }
}
