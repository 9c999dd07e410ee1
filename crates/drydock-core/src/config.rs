//! Process configuration, resolved once at startup.
//!
//! All environment lookups happen here so the rest of the system takes
//! configuration as an explicit value instead of reading globals.

use std::path::PathBuf;
use std::time::Duration;

use crate::exec::DEFAULT_TIMEOUT;
use crate::stage::{StageConfig, StageKind};

/// Configuration for one drydock process.
#[derive(Debug, Clone)]
pub struct CiConfig {
    /// Address the webhook listener binds to.
    pub bind_addr: String,

    /// Base directory holding per-commit build workspaces.
    pub workspace_dir: PathBuf,

    /// Directory holding append-only build records.
    pub history_dir: PathBuf,

    /// GitHub token. Absent or blank downgrades status reporting to the
    /// in-memory recorder; it never crashes the pipeline.
    pub github_token: Option<String>,

    /// Compile stage command.
    pub compile_command: Vec<String>,

    /// Test stage command.
    pub test_command: Vec<String>,

    /// Per-command timeout ceiling.
    pub command_timeout: Duration,
}

impl Default for CiConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            workspace_dir: std::env::temp_dir().join("ci-builds"),
            history_dir: PathBuf::from("ci-build-history"),
            github_token: None,
            compile_command: split_command("mvn clean compile"),
            test_command: split_command("mvn test"),
            command_timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl CiConfig {
    /// Resolve configuration from environment variables, with defaults
    /// for anything unset.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bind_addr: env_or("DRYDOCK_BIND_ADDR", defaults.bind_addr),
            workspace_dir: std::env::var("DRYDOCK_WORKSPACE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.workspace_dir),
            history_dir: std::env::var("DRYDOCK_HISTORY_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.history_dir),
            github_token: std::env::var("GITHUB_TOKEN").ok(),
            compile_command: std::env::var("DRYDOCK_COMPILE_CMD")
                .map(|raw| split_command(&raw))
                .unwrap_or(defaults.compile_command),
            test_command: std::env::var("DRYDOCK_TEST_CMD")
                .map(|raw| split_command(&raw))
                .unwrap_or(defaults.test_command),
            command_timeout: defaults.command_timeout,
        }
    }

    pub fn compile_stage(&self) -> StageConfig {
        StageConfig::new(StageKind::Compile, self.compile_command.clone())
    }

    pub fn test_stage(&self) -> StageConfig {
        StageConfig::new(StageKind::Test, self.test_command.clone())
    }
}

fn env_or(key: &str, default: String) -> String {
    std::env::var(key).unwrap_or(default)
}

/// Split a command string on whitespace. Commands run without a shell,
/// so quoting is not interpreted.
pub fn split_command(raw: &str) -> Vec<String> {
    raw.split_whitespace().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_buildable() {
        let config = CiConfig::default();
        assert_eq!(config.compile_command[0], "mvn");
        assert_eq!(config.compile_stage().kind, StageKind::Compile);
        assert_eq!(config.test_stage().kind, StageKind::Test);
        assert_eq!(config.command_timeout, DEFAULT_TIMEOUT);
        assert!(config.github_token.is_none());
    }

    #[test]
    fn split_command_on_whitespace() {
        assert_eq!(
            split_command("cargo  test --workspace"),
            vec!["cargo", "test", "--workspace"]
        );
        assert!(split_command("   ").is_empty());
    }
}
