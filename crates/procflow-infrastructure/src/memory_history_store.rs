//! In-memory [`HistoryStore`] for tests and ephemeral runs.

use async_trait::async_trait;
use procflow_core::error::{ProcflowError, Result};
use procflow_core::history::{HistoryDocument, HistoryStore};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::Mutex;

/// Holds the document in memory and counts writes.
///
/// Reads and writes can be switched to fail to simulate an unavailable store.
#[derive(Debug, Default)]
pub struct InMemoryHistoryStore {
    document: Mutex<HistoryDocument>,
    writes: AtomicUsize,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(document: HistoryDocument) -> Self {
        Self {
            document: Mutex::new(document),
            ..Self::default()
        }
    }

    /// Number of successful writes so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Current stored document.
    pub async fn snapshot(&self) -> HistoryDocument {
        self.document.lock().await.clone()
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn read(&self) -> Result<HistoryDocument> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(ProcflowError::persistence("store is unavailable"));
        }
        Ok(self.document.lock().await.clone())
    }

    async fn write(&self, document: &HistoryDocument) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(ProcflowError::persistence("store is unavailable"));
        }
        *self.document.lock().await = document.clone();
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
