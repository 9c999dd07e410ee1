//! Integration tests for the build pipeline with recording fakes.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use drydock_core::{
    BuildEvent, Notifier, NotifyError, Pipeline, PipelineOutcome, RecordingNotifier,
    RecordingRunner, StageConfig, StageKind, StatusState, WorkspaceManager,
};
use drydock_store::fakes::MemoryBuildHistory;
use drydock_store::{BuildLedger, BuildState, StoreError, StoreResult};

const SHA: &str = "abc123def456789012345678901234567890abcd";

fn event() -> BuildEvent {
    BuildEvent {
        owner_login: "octocat".to_string(),
        repository_name: "Hello-World".to_string(),
        clone_url: "https://github.com/octocat/Hello-World.git".to_string(),
        branch: "main".to_string(),
        commit_sha: SHA.to_string(),
    }
}

fn cmd(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

struct Harness {
    runner: Arc<RecordingRunner>,
    notifier: Arc<RecordingNotifier>,
    history: Arc<MemoryBuildHistory>,
    pipeline: Pipeline,
}

fn harness(base_dir: &Path) -> Harness {
    let runner = Arc::new(RecordingRunner::new());
    let notifier = Arc::new(RecordingNotifier::new());
    let history = Arc::new(MemoryBuildHistory::new());
    let (compile, test) = stages();
    let pipeline = Pipeline::new(
        runner.clone(),
        WorkspaceManager::new(runner.clone(), base_dir.to_path_buf()),
        notifier.clone(),
        history.clone(),
        compile,
        test,
    );
    Harness {
        runner,
        notifier,
        history,
        pipeline,
    }
}

/// Notifier whose every delivery is rejected by the status API.
struct RejectedStatusNotifier;

#[async_trait]
impl Notifier for RejectedStatusNotifier {
    async fn set_status(
        &self,
        _owner: &str,
        _repo: &str,
        _sha: &str,
        _state: StatusState,
        _description: &str,
    ) -> Result<(), NotifyError> {
        Err(NotifyError::Rejected {
            status: 401,
            body: "Bad credentials".to_string(),
        })
    }

    fn is_live(&self) -> bool {
        true
    }
}

/// Ledger whose writes always fail, as a full disk would.
struct FullDiskLedger;

#[async_trait]
impl BuildLedger for FullDiskLedger {
    async fn append(
        &self,
        _commit_sha: &str,
        _state: BuildState,
        _compile_log: &str,
        _test_log: &str,
    ) -> StoreResult<String> {
        Err(StoreError::Io(std::io::Error::other(
            "no space left on device",
        )))
    }

    async fn list(&self) -> StoreResult<Vec<String>> {
        Ok(Vec::new())
    }

    async fn read(&self, record_id: &str) -> StoreResult<String> {
        Err(StoreError::NotFound(record_id.to_string()))
    }
}

fn stages() -> (StageConfig, StageConfig) {
    (
        StageConfig::new(StageKind::Compile, cmd(&["mvn", "clean", "compile"])),
        StageConfig::new(StageKind::Test, cmd(&["mvn", "test"])),
    )
}

/// Simulate the directory a real clone would have created, so cleanup
/// behavior is observable with the recording runner.
fn seed_workspace(base_dir: &Path) -> std::path::PathBuf {
    let workspace = base_dir.join(SHA);
    std::fs::create_dir_all(&workspace).unwrap();
    std::fs::write(workspace.join("pom.xml"), "<project/>").unwrap();
    workspace
}

#[tokio::test]
async fn successful_run_reports_pending_then_success() {
    let base = tempfile::tempdir().unwrap();
    let h = harness(base.path());
    let workspace = seed_workspace(base.path());

    let report = h.pipeline.run(&event()).await;

    assert_eq!(report.outcome, PipelineOutcome::Success);
    assert_eq!(report.commit_sha, SHA);
    assert!(report.record_id.is_some());

    // Exactly two statuses, in order.
    let calls = h.notifier.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].state, StatusState::Pending);
    assert_eq!(calls[0].description, "Build started");
    assert_eq!(calls[0].owner, "octocat");
    assert_eq!(calls[0].repo, "Hello-World");
    assert_eq!(calls[0].sha, SHA);
    assert_eq!(calls[1].state, StatusState::Success);
    assert_eq!(calls[1].description, "Build and tests passed");

    // One success record.
    assert_eq!(h.history.len(), 1);
    let text = h.history.read(&report.record_id.unwrap()).await.unwrap();
    assert!(text.contains("State: success"));

    // clone, checkout, compile, test.
    assert_eq!(h.runner.calls().len(), 4);

    // No residual workspace.
    assert!(!workspace.exists());
}

#[tokio::test]
async fn compile_failure_skips_tests() {
    let base = tempfile::tempdir().unwrap();
    let h = harness(base.path());
    let workspace = seed_workspace(base.path());

    h.runner.push_result(0, "cloned");
    h.runner.push_result(0, "checked out");
    h.runner.push_result(1, "compilation error: missing symbol");

    let report = h.pipeline.run(&event()).await;

    assert_eq!(report.outcome, PipelineOutcome::CompileFailed);

    let calls = h.notifier.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].state, StatusState::Pending);
    assert_eq!(calls[1].state, StatusState::Failure);
    assert!(calls[1].description.contains("Compilation failed"));

    // The test stage never ran.
    let runner_calls = h.runner.calls();
    assert_eq!(runner_calls.len(), 3);
    assert!(runner_calls
        .iter()
        .all(|c| c.command != vec!["mvn".to_string(), "test".to_string()]));

    // Failure record with the compile log.
    assert_eq!(h.history.len(), 1);
    let text = h.history.read(&report.record_id.unwrap()).await.unwrap();
    assert!(text.contains("State: failure"));
    assert!(text.contains("compilation error"));

    assert!(!workspace.exists());
}

#[tokio::test]
async fn test_failure_keeps_both_logs() {
    let base = tempfile::tempdir().unwrap();
    let h = harness(base.path());
    seed_workspace(base.path());

    h.runner.push_result(0, "cloned");
    h.runner.push_result(0, "checked out");
    h.runner.push_result(0, "BUILD SUCCESS");
    h.runner.push_result(1, "2 tests failed");

    let report = h.pipeline.run(&event()).await;

    assert_eq!(report.outcome, PipelineOutcome::TestsFailed);
    let last = h.notifier.last_call().unwrap();
    assert_eq!(last.state, StatusState::Failure);
    assert!(last.description.contains("Tests failed"));

    let text = h.history.read(&report.record_id.unwrap()).await.unwrap();
    assert!(text.contains("BUILD SUCCESS"));
    assert!(text.contains("2 tests failed"));
}

#[tokio::test]
async fn clone_failure_reports_without_record() {
    let base = tempfile::tempdir().unwrap();
    let h = harness(base.path());

    h.runner.push_result(128, "fatal: could not read from remote");

    let report = h.pipeline.run(&event()).await;

    assert_eq!(report.outcome, PipelineOutcome::CloneFailed);
    assert!(report.record_id.is_none());

    let calls = h.notifier.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1].state, StatusState::Failure);

    // Only the clone ran; nothing was persisted.
    assert_eq!(h.runner.calls().len(), 1);
    assert!(h.history.is_empty());
}

#[tokio::test]
async fn spawn_failure_reports_error_status() {
    let base = tempfile::tempdir().unwrap();
    let h = harness(base.path());
    let workspace = seed_workspace(base.path());

    h.runner.push_result(0, "cloned");
    h.runner.push_result(0, "checked out");
    h.runner.push_spawn_failure("mvn: command not found");

    let report = h.pipeline.run(&event()).await;

    assert_eq!(report.outcome, PipelineOutcome::Errored);
    assert!(report.record_id.is_none());

    let last = h.notifier.last_call().unwrap();
    assert_eq!(last.state, StatusState::Error);
    assert!(last.description.contains("Internal error"));

    // Cleanup still ran.
    assert!(!workspace.exists());
}

#[tokio::test]
async fn workspace_is_removed_for_every_outcome() {
    // (scripted clone results leading to each terminal outcome)
    let scripts: &[&[(i32, &str)]] = &[
        &[(0, ""), (0, ""), (0, ""), (0, "")], // success
        &[(0, ""), (0, ""), (1, "")],          // compile failure
        &[(0, ""), (0, ""), (0, ""), (1, "")], // test failure
        &[(1, "")],                            // clone failure
    ];

    for script in scripts {
        let base = tempfile::tempdir().unwrap();
        let h = harness(base.path());
        let workspace = seed_workspace(base.path());
        for (code, out) in script.iter() {
            h.runner.push_result(*code, out);
        }

        h.pipeline.run(&event()).await;
        assert!(
            !workspace.exists(),
            "workspace must not survive script {script:?}"
        );
    }
}

#[tokio::test]
async fn failed_status_delivery_does_not_mask_success() {
    let base = tempfile::tempdir().unwrap();
    let runner = Arc::new(RecordingRunner::new());
    let history = Arc::new(MemoryBuildHistory::new());
    let (compile, test) = stages();
    let pipeline = Pipeline::new(
        runner.clone(),
        WorkspaceManager::new(runner.clone(), base.path().to_path_buf()),
        Arc::new(RejectedStatusNotifier),
        history.clone(),
        compile,
        test,
    );

    let report = pipeline.run(&event()).await;

    // Every delivery failed, yet the run completed and was recorded.
    assert_eq!(report.outcome, PipelineOutcome::Success);
    assert_eq!(history.len(), 1);
    let text = history.read(&report.record_id.unwrap()).await.unwrap();
    assert!(text.contains("State: success"));
    assert_eq!(runner.calls().len(), 4, "all stages still ran");
}

#[tokio::test]
async fn failed_status_delivery_does_not_mask_build_failure() {
    let base = tempfile::tempdir().unwrap();
    let runner = Arc::new(RecordingRunner::new());
    let history = Arc::new(MemoryBuildHistory::new());
    let (compile, test) = stages();
    let pipeline = Pipeline::new(
        runner.clone(),
        WorkspaceManager::new(runner.clone(), base.path().to_path_buf()),
        Arc::new(RejectedStatusNotifier),
        history.clone(),
        compile,
        test,
    );

    runner.push_result(0, "cloned");
    runner.push_result(0, "checked out");
    runner.push_result(1, "compilation error");

    let report = pipeline.run(&event()).await;

    assert_eq!(report.outcome, PipelineOutcome::CompileFailed);
    let text = history.read(&report.record_id.unwrap()).await.unwrap();
    assert!(text.contains("State: failure"));
}

#[tokio::test]
async fn record_persistence_failure_keeps_reported_statuses() {
    let base = tempfile::tempdir().unwrap();
    let runner = Arc::new(RecordingRunner::new());
    let notifier = Arc::new(RecordingNotifier::new());
    let (compile, test) = stages();
    let pipeline = Pipeline::new(
        runner.clone(),
        WorkspaceManager::new(runner.clone(), base.path().to_path_buf()),
        notifier.clone(),
        Arc::new(FullDiskLedger),
        compile,
        test,
    );

    let report = pipeline.run(&event()).await;

    // The write failed, but nothing rolls back: the run is still a
    // success with its full status sequence, just without a record id.
    assert_eq!(report.outcome, PipelineOutcome::Success);
    assert!(report.record_id.is_none());

    let calls = notifier.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].state, StatusState::Pending);
    assert_eq!(calls[1].state, StatusState::Success);
}

#[tokio::test]
async fn repeated_runs_for_one_commit_never_trip_on_leftovers() {
    let base = tempfile::tempdir().unwrap();
    let h = harness(base.path());

    // Leftover state from a crashed run at the same path.
    let workspace = seed_workspace(base.path());
    std::fs::create_dir_all(workspace.join("target/classes")).unwrap();

    let first = h.pipeline.run(&event()).await;
    assert_eq!(first.outcome, PipelineOutcome::Success);

    seed_workspace(base.path());
    let second = h.pipeline.run(&event()).await;
    assert_eq!(second.outcome, PipelineOutcome::Success);

    assert_eq!(h.history.len(), 2);
    assert!(!workspace.exists());
}
