//! Append-only diagnosis history kept as JSON lines.

use std::path::PathBuf;

use tokio::io::AsyncWriteExt;

use crate::error::StorageError;
use crate::record::DiagnosisRecord;

/// One `DiagnosisRecord` per line. Ids are assigned on append as the
/// 1-based line number. Callers must serialize concurrent appends.
#[derive(Debug, Clone)]
pub struct HistoryLog {
    path: PathBuf,
}

impl HistoryLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Append `record`, returning the id it was stored under.
    pub async fn append(&self, mut record: DiagnosisRecord) -> Result<u64, StorageError> {
        let id = self.read_all().await?.len() as u64 + 1;
        record.id = id;
        let mut line =
            serde_json::to_string(&record).map_err(|e| StorageError::Backend(e.to_string()))?;
        line.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| {
                StorageError::Backend(format!(
                    "could not open history '{}': {}",
                    self.path.display(),
                    e
                ))
            })?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        file.flush()
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(id)
    }

    /// Newest first; `limit == 0` returns everything.
    pub async fn list(&self, limit: usize) -> Result<Vec<DiagnosisRecord>, StorageError> {
        let records = self.read_all().await?;
        let take = if limit == 0 { records.len() } else { limit };
        Ok(records.into_iter().rev().take(take).collect())
    }

    /// A missing file is an empty history.
    async fn read_all(&self) -> Result<Vec<DiagnosisRecord>, StorageError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(StorageError::Backend(format!(
                    "could not read history '{}': {}",
                    self.path.display(),
                    e
                )))
            }
        };
        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                serde_json::from_str(line).map_err(|e| StorageError::Malformed {
                    path: self.path.display().to_string(),
                    message: e.to_string(),
                })
            })
            .collect()
    }
}
