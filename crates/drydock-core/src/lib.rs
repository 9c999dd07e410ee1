//! drydock-core - build pipeline orchestration for a minimal CI server
//!
//! Provides the pipeline that:
//! - Clones the pushed commit into an isolated workspace
//! - Compiles and tests it via injectable command runners
//! - Reports commit statuses and appends an immutable build record
//! - Cleans the workspace up on every exit path

pub mod config;
pub mod error;
pub mod event;
pub mod exec;
pub mod git;
pub mod notify;
pub mod pipeline;
pub mod stage;

// Re-export key types
pub use config::CiConfig;
pub use error::{ExecError, NotifyError};
pub use event::{BuildEvent, PushPayload};
pub use exec::{CommandRunner, ExecResult, ProcessRunner, RecordingRunner};
pub use git::{CloneOutcome, WorkspaceManager};
pub use notify::{notifier_from_token, GitHubNotifier, Notifier, RecordingNotifier, StatusState};
pub use pipeline::{Pipeline, PipelineOutcome, PipelineReport};
pub use stage::{run_stage, StageConfig, StageKind, StageOutcome};
