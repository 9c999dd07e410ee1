//! Commit status notification.
//!
//! Two interchangeable notifiers sit behind one trait: [`GitHubNotifier`]
//! posts to the commit status API, [`RecordingNotifier`] keeps the calls
//! in memory. The pipeline completes either way; without a token it just
//! has no external visibility.

use std::fmt;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::error::NotifyError;

/// Status context shown next to the commit on the hosting service.
const STATUS_CONTEXT: &str = "drydock-ci";

/// Commit status states accepted by the hosting service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusState {
    Pending,
    Success,
    Failure,
    Error,
}

impl StatusState {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusState::Pending => "pending",
            StatusState::Success => "success",
            StatusState::Failure => "failure",
            StatusState::Error => "error",
        }
    }
}

impl fmt::Display for StatusState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Delivers build status updates for a commit.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn set_status(
        &self,
        owner: &str,
        repo: &str,
        sha: &str,
        state: StatusState,
        description: &str,
    ) -> Result<(), NotifyError>;

    /// Whether statuses actually leave the process.
    fn is_live(&self) -> bool;
}

/// Live notifier posting to the GitHub commit status API.
pub struct GitHubNotifier {
    client: reqwest::Client,
    token: String,
    api_base: String,
}

impl GitHubNotifier {
    /// Create a notifier for the given personal access token.
    ///
    /// A blank token is a configuration mistake, not a reason to post
    /// unauthenticated requests; it is rejected here.
    pub fn new(token: &str) -> Result<Self, NotifyError> {
        if token.trim().is_empty() {
            return Err(NotifyError::MissingToken);
        }
        Ok(Self {
            client: reqwest::Client::new(),
            token: token.to_string(),
            api_base: "https://api.github.com".to_string(),
        })
    }

    /// Point the notifier at a different API host (tests).
    pub fn with_api_base(mut self, api_base: &str) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl Notifier for GitHubNotifier {
    async fn set_status(
        &self,
        owner: &str,
        repo: &str,
        sha: &str,
        state: StatusState,
        description: &str,
    ) -> Result<(), NotifyError> {
        let url = format!("{}/repos/{}/{}/statuses/{}", self.api_base, owner, repo, sha);
        let body = json!({
            "state": state.as_str(),
            "context": STATUS_CONTEXT,
            "description": description,
        });

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("token {}", self.token))
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", "drydock-ci")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        info!(%sha, state = state.as_str(), "commit status delivered");
        Ok(())
    }

    fn is_live(&self) -> bool {
        true
    }
}

/// One status call observed by [`RecordingNotifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusCall {
    pub owner: String,
    pub repo: String,
    pub sha: String,
    pub state: StatusState,
    pub description: String,
}

/// In-memory notifier used without a configured token and in tests.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    calls: Mutex<Vec<StatusCall>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// All status calls recorded so far.
    pub fn calls(&self) -> Vec<StatusCall> {
        self.calls.lock().unwrap().clone()
    }

    /// The most recent status call, if any.
    pub fn last_call(&self) -> Option<StatusCall> {
        self.calls.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn set_status(
        &self,
        owner: &str,
        repo: &str,
        sha: &str,
        state: StatusState,
        description: &str,
    ) -> Result<(), NotifyError> {
        self.calls.lock().unwrap().push(StatusCall {
            owner: owner.to_string(),
            repo: repo.to_string(),
            sha: sha.to_string(),
            state,
            description: description.to_string(),
        });
        Ok(())
    }

    fn is_live(&self) -> bool {
        false
    }
}

/// Select the notifier implementation for the configured token.
///
/// A present, non-blank token selects the live notifier; anything else
/// falls back to in-memory recording so the pipeline can still run.
pub fn notifier_from_token(token: Option<&str>) -> Arc<dyn Notifier> {
    if let Some(token) = token {
        if let Ok(live) = GitHubNotifier::new(token) {
            return Arc::new(live);
        }
    }
    info!("no GitHub token configured, recording statuses in memory");
    Arc::new(RecordingNotifier::new())
}
