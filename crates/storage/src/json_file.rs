//! `KnowledgeStore` backed by a catalog JSON file on disk.
//!
//! The file is re-read on every `load_catalog`, so edits made by an
//! administrator become visible on the next load. The version is the
//! leading 64 bits of the SHA-256 of the file contents, so any edit
//! moves it regardless of mtime granularity, and rewriting identical
//! bytes keeps cached snapshots valid. Diagnosis history is
//! appended to an optional JSON-lines file, or kept in memory when no
//! history file is configured.

use std::path::PathBuf;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;

use crate::error::StorageError;
use crate::history::HistoryLog;
use crate::record::{Catalog, DiagnosisRecord, DiseaseId, PreventionRecord, TreatmentRecord};
use crate::traits::KnowledgeStore;

pub struct JsonFileStore {
    path: PathBuf,
    log: Option<HistoryLog>,
    history: Mutex<Vec<DiagnosisRecord>>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            log: None,
            history: Mutex::new(Vec::new()),
        }
    }

    /// Persist diagnosis history as JSON lines at `history_path`.
    pub fn with_history(mut self, history_path: impl Into<PathBuf>) -> Self {
        self.log = Some(HistoryLog::new(history_path));
        self
    }

    async fn read(&self) -> Result<Catalog, StorageError> {
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            StorageError::Unavailable(format!("could not read '{}': {}", self.path.display(), e))
        })?;
        serde_json::from_str(&content).map_err(|e| StorageError::Malformed {
            path: self.path.display().to_string(),
            message: e.to_string(),
        })
    }
}

fn content_version(bytes: &[u8]) -> u64 {
    let digest = Sha256::digest(bytes);
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(head)
}

#[async_trait]
impl KnowledgeStore for JsonFileStore {
    async fn load_catalog(&self) -> Result<Catalog, StorageError> {
        self.read().await
    }

    async fn catalog_version(&self) -> Result<u64, StorageError> {
        let bytes = tokio::fs::read(&self.path).await.map_err(|e| {
            StorageError::Unavailable(format!("could not read '{}': {}", self.path.display(), e))
        })?;
        Ok(content_version(&bytes))
    }

    async fn list_treatments(
        &self,
        disease_id: DiseaseId,
    ) -> Result<Vec<TreatmentRecord>, StorageError> {
        Ok(self.read().await?.active_treatments(disease_id))
    }

    async fn list_preventions(
        &self,
        disease_id: DiseaseId,
    ) -> Result<Vec<PreventionRecord>, StorageError> {
        Ok(self.read().await?.active_preventions(disease_id))
    }

    async fn insert_diagnosis(&self, mut record: DiagnosisRecord) -> Result<u64, StorageError> {
        // The lock also serializes appends to the history file.
        let mut history = self.history.lock().await;
        if let Some(log) = &self.log {
            return log.append(record).await;
        }
        let id = history.len() as u64 + 1;
        record.id = id;
        history.push(record);
        Ok(id)
    }

    async fn list_diagnoses(&self, limit: usize) -> Result<Vec<DiagnosisRecord>, StorageError> {
        let history = self.history.lock().await;
        if let Some(log) = &self.log {
            return log.list(limit).await;
        }
        let take = if limit == 0 { history.len() } else { limit };
        Ok(history.iter().rev().take(take).cloned().collect())
    }
}
