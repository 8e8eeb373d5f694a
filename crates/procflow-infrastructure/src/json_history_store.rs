//! File-backed [`HistoryStore`].

use crate::dto::StoredDocument;
use crate::paths::ProcflowPaths;
use crate::storage::AtomicJsonFile;
use async_trait::async_trait;
use chrono::Utc;
use procflow_core::error::{ProcflowError, Result};
use procflow_core::history::{HistoryDocument, HistoryStore};
use std::path::PathBuf;
use std::sync::Arc;

/// Keeps the whole history in one pretty-printed JSON file.
///
/// File I/O runs on the blocking pool; each write replaces the file
/// atomically.
#[derive(Clone)]
pub struct JsonHistoryStore {
    file: Arc<AtomicJsonFile<StoredDocument>>,
}

impl JsonHistoryStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            file: Arc::new(AtomicJsonFile::new(path)),
        }
    }

    /// Store at the default data-directory location.
    pub fn default_location() -> Result<Self> {
        Ok(Self::new(ProcflowPaths::default().history_file()?))
    }

    pub fn path(&self) -> PathBuf {
        self.file.path().to_path_buf()
    }
}

#[async_trait]
impl HistoryStore for JsonHistoryStore {
    async fn read(&self) -> Result<HistoryDocument> {
        let file = self.file.clone();
        let stored = tokio::task::spawn_blocking(move || file.load())
            .await
            .map_err(|e| ProcflowError::internal(format!("Failed to join task: {}", e)))??;

        Ok(stored.map(HistoryDocument::from).unwrap_or_default())
    }

    async fn write(&self, document: &HistoryDocument) -> Result<()> {
        let file = self.file.clone();
        let stored = StoredDocument::from(document.clone());
        tokio::task::spawn_blocking(move || file.save(&stored))
            .await
            .map_err(|e| ProcflowError::internal(format!("Failed to join task: {}", e)))??;

        tracing::debug!(
            path = %self.file.path().display(),
            sessions = document.sessions.len(),
            projects = document.projects.len(),
            "History written"
        );
        Ok(())
    }

    async fn set_aside(&self) -> Result<()> {
        let file = self.file.clone();
        let suffix = format!("corrupt-{}", Utc::now().format("%Y%m%dT%H%M%S%3f"));
        let moved = tokio::task::spawn_blocking(move || file.set_aside(&suffix))
            .await
            .map_err(|e| ProcflowError::internal(format!("Failed to join task: {}", e)))??;

        if let Some(moved) = moved {
            tracing::warn!(
                path = %self.file.path().display(),
                kept_as = %moved.display(),
                "Unparsable history file moved aside"
            );
        }
        Ok(())
    }
}
