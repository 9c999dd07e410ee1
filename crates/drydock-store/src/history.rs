//! Filesystem-backed build ledger.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::info;

use crate::error::{StoreError, StoreResult};
use crate::record::{BuildRecord, BuildState};

/// Append-only store of completed build records.
///
/// There is no update or delete; build history is a write-once log.
#[async_trait]
pub trait BuildLedger: Send + Sync {
    /// Persist one record and return its id.
    async fn append(
        &self,
        commit_sha: &str,
        state: BuildState,
        compile_log: &str,
        test_log: &str,
    ) -> StoreResult<String>;

    /// Ids of all stored records.
    async fn list(&self) -> StoreResult<Vec<String>>;

    /// The rendered text of one record.
    async fn read(&self, record_id: &str) -> StoreResult<String>;
}

/// Build ledger keeping one text file per record under a base
/// directory. Records survive server restarts.
pub struct FsBuildHistory {
    base_dir: PathBuf,
}

impl FsBuildHistory {
    /// Open (and create if needed) a history directory.
    pub fn new(base_dir: &Path) -> StoreResult<Self> {
        std::fs::create_dir_all(base_dir)?;
        Ok(Self {
            base_dir: base_dir.to_path_buf(),
        })
    }

    fn record_path(&self, record_id: &str) -> StoreResult<PathBuf> {
        // Ids are plain file names; anything path-like is rejected so a
        // caller-supplied id cannot escape the base directory.
        if record_id.is_empty()
            || record_id.contains('/')
            || record_id.contains('\\')
            || record_id.contains("..")
        {
            return Err(StoreError::InvalidId(record_id.to_string()));
        }
        Ok(self.base_dir.join(record_id))
    }
}

#[async_trait]
impl BuildLedger for FsBuildHistory {
    async fn append(
        &self,
        commit_sha: &str,
        state: BuildState,
        compile_log: &str,
        test_log: &str,
    ) -> StoreResult<String> {
        let record = BuildRecord::new(commit_sha, state, compile_log, test_log);
        let path = self.record_path(&record.id)?;
        tokio::fs::write(&path, record.render()).await?;
        info!(record_id = %record.id, state = %record.state, "build record appended");
        Ok(record.id)
    }

    async fn list(&self) -> StoreResult<Vec<String>> {
        let mut ids = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.base_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if let Some(name) = entry.file_name().to_str() {
                ids.push(name.to_string());
            }
        }
        ids.sort();
        Ok(ids)
    }

    async fn read(&self, record_id: &str) -> StoreResult<String> {
        let path = self.record_path(record_id)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(record_id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}
