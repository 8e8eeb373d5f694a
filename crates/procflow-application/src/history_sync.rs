//! Persistence synchronizer.
//!
//! Translates session and project changes into whole-document rewrites of a
//! [`HistoryStore`]. Writes are best-effort and last-write-wins: a failed
//! write is recorded and returned, never retried.

use crate::project_index::detach_sessions;
use procflow_core::conversation::Session;
use procflow_core::error::{ProcflowError, Result};
use procflow_core::history::{HistoryDocument, HistoryStore};
use procflow_core::project::Project;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

pub struct HistorySynchronizer {
    store: Arc<dyn HistoryStore>,
    /// Serializes read-modify-write cycles against the store.
    write_lock: tokio::sync::Mutex<()>,
    failed_writes: AtomicUsize,
    last_error: Mutex<Option<String>>,
}

impl HistorySynchronizer {
    pub fn new(store: Arc<dyn HistoryStore>) -> Self {
        Self {
            store,
            write_lock: tokio::sync::Mutex::new(()),
            failed_writes: AtomicUsize::new(0),
            last_error: Mutex::new(None),
        }
    }

    /// Reads every session and project. Never fails: an unavailable or
    /// unparsable store yields empty collections.
    pub async fn load_all(&self) -> HistoryDocument {
        match self.store.read().await {
            Ok(document) => {
                tracing::debug!(
                    sessions = document.sessions.len(),
                    projects = document.projects.len(),
                    "History loaded"
                );
                document
            }
            Err(e) => {
                tracing::warn!("Failed to load history, starting empty: {}", e);
                HistoryDocument::default()
            }
        }
    }

    /// Upserts one session: replaced in place when known, otherwise inserted
    /// at the front.
    pub async fn save_session(&self, session: &Session) -> Result<()> {
        self.commit("save_session", |document| {
            match document.sessions.iter_mut().find(|s| s.id == session.id) {
                Some(existing) => *existing = session.clone(),
                None => document.sessions.insert(0, session.clone()),
            }
            Ok(())
        })
        .await
    }

    pub async fn delete_session(&self, id: &str) -> Result<()> {
        self.commit("delete_session", |document| {
            document.sessions.retain(|s| s.id != id);
            Ok(())
        })
        .await
    }

    /// Removes every session; projects survive.
    pub async fn delete_all(&self) -> Result<()> {
        self.commit("delete_all", |document| {
            document.sessions.clear();
            Ok(())
        })
        .await
    }

    /// Rewrites the session collection wholesale (e.g. after a reorder).
    pub async fn replace_all(&self, sessions: &[Session]) -> Result<()> {
        self.commit("replace_all", |document| {
            document.sessions = sessions.to_vec();
            Ok(())
        })
        .await
    }

    pub async fn create_project(&self, project: &Project) -> Result<()> {
        self.commit("create_project", |document| {
            match document.projects.iter_mut().find(|p| p.id == project.id) {
                Some(existing) => *existing = project.clone(),
                None => document.projects.push(project.clone()),
            }
            Ok(())
        })
        .await
    }

    /// Removes the project and nulls every stored session reference to it.
    pub async fn delete_project(&self, id: &str) -> Result<()> {
        self.commit("delete_project", |document| {
            document.projects.retain(|p| p.id != id);
            detach_sessions(id, &mut document.sessions);
            Ok(())
        })
        .await
    }

    pub async fn rename_project(&self, id: &str, name: &str) -> Result<()> {
        self.commit("rename_project", |document| {
            let project = document
                .projects
                .iter_mut()
                .find(|p| p.id == id)
                .ok_or_else(|| ProcflowError::not_found("Project", id))?;
            project.name = name.to_string();
            Ok(())
        })
        .await
    }

    /// Number of writes that failed since startup.
    pub fn failed_writes(&self) -> usize {
        self.failed_writes.load(Ordering::SeqCst)
    }

    pub fn last_error(&self) -> Option<String> {
        self.last_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Reads the stored document, applies `update` and writes it back.
    ///
    /// An unparsable document is set aside by the store and the cycle
    /// continues from an empty one. Any other read failure aborts the cycle
    /// so a document that is merely unreachable is never clobbered.
    async fn commit<F>(&self, operation: &'static str, update: F) -> Result<()>
    where
        F: FnOnce(&mut HistoryDocument) -> Result<()>,
    {
        let _guard = self.write_lock.lock().await;
        let result = async {
            let mut document = match self.store.read().await {
                Ok(document) => document,
                Err(e) if e.is_serialization() => {
                    tracing::warn!(operation, "Stored history is unparsable, starting over: {}", e);
                    self.store.set_aside().await?;
                    HistoryDocument::default()
                }
                Err(e) => return Err(e),
            };
            update(&mut document)?;
            self.store.write(&document).await
        }
        .await;

        if let Err(e) = &result {
            if !e.is_not_found() {
                self.failed_writes.fetch_add(1, Ordering::SeqCst);
                *self.last_error.lock().unwrap_or_else(PoisonError::into_inner) =
                    Some(e.to_string());
            }
            tracing::debug!(operation, "History write failed: {}", e);
        }
        result
    }
}
