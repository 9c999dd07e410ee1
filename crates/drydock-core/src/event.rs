//! Build events and push webhook payload decoding.

use serde::Deserialize;

/// One commit to build, as extracted from a push notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildEvent {
    /// Repository owner login.
    pub owner_login: String,

    /// Repository name.
    pub repository_name: String,

    /// HTTPS URL used to clone the repository.
    pub clone_url: String,

    /// Branch name derived from the pushed ref.
    pub branch: String,

    /// Full commit SHA to check out.
    pub commit_sha: String,
}

/// Raw push-event payload as delivered by the hosting service.
#[derive(Debug, Clone, Deserialize)]
pub struct PushPayload {
    /// Full ref, e.g. `refs/heads/main`.
    #[serde(rename = "ref")]
    pub git_ref: String,

    /// SHA of the head commit after the push.
    pub after: String,

    pub repository: PushRepository,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PushRepository {
    pub name: String,
    pub clone_url: String,
    pub owner: PushOwner,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PushOwner {
    pub login: String,
}

impl PushPayload {
    /// Branch name from the pushed ref, or the full ref when it is not
    /// a branch head.
    pub fn branch(&self) -> &str {
        self.git_ref
            .strip_prefix("refs/heads/")
            .unwrap_or(&self.git_ref)
    }

    /// Convert into a [`BuildEvent`].
    ///
    /// Returns `None` when there is nothing to build: an empty `after`
    /// SHA, or the all-zero SHA a branch deletion carries.
    pub fn into_event(self) -> Option<BuildEvent> {
        if self.after.is_empty() || self.after.chars().all(|c| c == '0') {
            return None;
        }
        let branch = self.branch().to_string();
        Some(BuildEvent {
            owner_login: self.repository.owner.login,
            repository_name: self.repository.name,
            clone_url: self.repository.clone_url,
            branch,
            commit_sha: self.after,
        })
    }
}
