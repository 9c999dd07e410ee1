//! Build record types and their flat-text rendering.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Terminal state of a completed pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildState {
    Success,
    Failure,
}

impl BuildState {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildState::Success => "success",
            BuildState::Failure => "failure",
        }
    }
}

impl fmt::Display for BuildState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One immutable record of a completed pipeline run.
///
/// Created once at the end of a run; never mutated or deleted.
#[derive(Debug, Clone)]
pub struct BuildRecord {
    /// Unique id, also the record's file name.
    pub id: String,

    pub commit_sha: String,
    pub state: BuildState,
    pub created_at: DateTime<Utc>,
    pub compile_log: String,
    pub test_log: String,
}

impl BuildRecord {
    /// Build a record stamped with the current time.
    pub fn new(commit_sha: &str, state: BuildState, compile_log: &str, test_log: &str) -> Self {
        let created_at = Utc::now();
        Self {
            id: record_id(commit_sha, created_at),
            commit_sha: commit_sha.to_string(),
            state,
            created_at,
            compile_log: compile_log.to_string(),
            test_log: test_log.to_string(),
        }
    }

    /// Render the record as labeled plain text.
    pub fn render(&self) -> String {
        format!(
            "Commit SHA: {}\nDate: {}\nState: {}\n-----Compile Log-----:\n{}\n-----Test Log-----:\n{}\n",
            self.commit_sha,
            self.created_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            self.state,
            self.compile_log,
            self.test_log,
        )
    }
}

/// Derive a record id from a short commit prefix and a sortable
/// timestamp, so repeated builds of one commit stay unique. Colons are
/// replaced to keep the id a portable file name.
pub fn record_id(commit_sha: &str, created_at: DateTime<Utc>) -> String {
    let prefix = &commit_sha[..7.min(commit_sha.len())];
    let timestamp = created_at
        .to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace(':', "-");
    format!("{prefix}-{timestamp}.txt")
}
