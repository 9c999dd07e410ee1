//! Error types for drydock-core

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while launching or supervising an external command.
///
/// A command that starts and exits non-zero is *not* an error here; that
/// outcome travels through [`crate::exec::ExecResult`]. These variants
/// cover the cases where the command could not run at all.
#[derive(Error, Debug)]
pub enum ExecError {
    /// The command list was empty.
    #[error("cannot execute an empty command")]
    EmptyCommand,

    /// The requested working directory does not exist.
    #[error("working directory does not exist: {0}")]
    MissingWorkDir(PathBuf),

    /// The executable could not be located or spawned.
    #[error("failed to spawn '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// Filesystem or pipe I/O failed while supervising the process.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while delivering a commit status update.
#[derive(Error, Debug)]
pub enum NotifyError {
    /// No token was configured for the live notifier.
    #[error("missing GitHub token")]
    MissingToken,

    /// The HTTP request could not be sent.
    #[error("status request failed: {0}")]
    Transport(String),

    /// The status API answered with a non-2xx response.
    #[error("status update rejected: {status} body={body}")]
    Rejected { status: u16, body: String },
}

impl From<reqwest::Error> for NotifyError {
    fn from(err: reqwest::Error) -> Self {
        NotifyError::Transport(err.to_string())
    }
}
