//! In-memory fake for the build ledger (testing only)

use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{StoreError, StoreResult};
use crate::record::{BuildRecord, BuildState};
use crate::BuildLedger;

/// In-memory build ledger keeping records in append order.
#[derive(Debug, Default)]
pub struct MemoryBuildHistory {
    records: Mutex<Vec<(String, String)>>,
}

impl MemoryBuildHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records appended so far.
    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl BuildLedger for MemoryBuildHistory {
    async fn append(
        &self,
        commit_sha: &str,
        state: BuildState,
        compile_log: &str,
        test_log: &str,
    ) -> StoreResult<String> {
        let record = BuildRecord::new(commit_sha, state, compile_log, test_log);
        let id = record.id.clone();
        self.records
            .lock()
            .unwrap()
            .push((id.clone(), record.render()));
        Ok(id)
    }

    async fn list(&self) -> StoreResult<Vec<String>> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .map(|(id, _)| id.clone())
            .collect())
    }

    async fn read(&self, record_id: &str) -> StoreResult<String> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .find(|(id, _)| id == record_id)
            .map(|(_, text)| text.clone())
            .ok_or_else(|| StoreError::NotFound(record_id.to_string()))
    }
}
