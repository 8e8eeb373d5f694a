//! Conversation service: the action surface over sessions, turns and
//! projects.
//!
//! All state lives behind one `RwLock`; no guard is held across an `.await`
//! on a collaborator or the store.

mod generation;
mod transcription;

pub use generation::{GenerationOutcome, GenerationReport};

use crate::history_sync::HistorySynchronizer;
use crate::project_index::ProjectIndex;
use crate::state::{ConversationState, ProcessingStatus, ProcessingStep};
use procflow_core::conversation::Session;
use procflow_core::error::{ProcflowError, Result};
use procflow_core::generation::{ProcessGenerator, Transcriber};
use procflow_core::history::HistoryStore;
use procflow_core::project::Project;
use procflow_execution::ExecutionController;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Owns the in-memory conversation state and coordinates generation,
/// transcription and persistence.
///
/// Cheap to clone; clones share state, so one clone may cancel an attempt
/// another clone is awaiting.
#[derive(Clone)]
pub struct ConversationService {
    state: Arc<RwLock<ConversationState>>,
    controller: Arc<ExecutionController>,
    sync: Arc<HistorySynchronizer>,
    generator: Arc<dyn ProcessGenerator>,
    transcriber: Arc<dyn Transcriber>,
}

impl ConversationService {
    /// Creates a service with an empty state. Call [`load_history`] to read
    /// the durable store.
    ///
    /// [`load_history`]: ConversationService::load_history
    pub fn new(
        store: Arc<dyn HistoryStore>,
        generator: Arc<dyn ProcessGenerator>,
        transcriber: Arc<dyn Transcriber>,
        timeout: Duration,
    ) -> Self {
        Self {
            state: Arc::new(RwLock::new(ConversationState::default())),
            controller: Arc::new(ExecutionController::new(timeout)),
            sync: Arc::new(HistorySynchronizer::new(store)),
            generator,
            transcriber,
        }
    }

    pub fn controller(&self) -> &ExecutionController {
        &self.controller
    }

    pub fn synchronizer(&self) -> &HistorySynchronizer {
        &self.sync
    }

    // ============================================================================
    // History
    // ============================================================================

    /// Replaces the in-memory state with the durable one. Never fails; an
    /// unreadable store loads as empty. References to missing projects are
    /// nulled and written back.
    pub async fn load_history(&self) {
        let document = self.sync.load_all().await;
        let projects = ProjectIndex::new(document.projects);
        let mut sessions = document.sessions;
        let pruned = projects.prune_dangling(&mut sessions);
        if pruned > 0 {
            tracing::warn!(pruned, "Dropped references to missing projects");
            if let Err(e) = self.sync.replace_all(&sessions).await {
                tracing::warn!("Failed to persist pruned project references: {}", e);
            }
        }

        let mut state = self.state.write().await;
        if let Some(current) = state.current_session_id.clone() {
            if !sessions.iter().any(|s| s.id == current) {
                state.current_session_id = None;
            }
        }
        tracing::info!(
            sessions = sessions.len(),
            projects = projects.list().len(),
            "History loaded"
        );
        state.sessions = sessions;
        state.projects = projects;
    }

    pub async fn sessions(&self) -> Vec<Session> {
        self.state.read().await.sessions.clone()
    }

    pub async fn session(&self, id: &str) -> Option<Session> {
        self.state.read().await.session(id).cloned()
    }

    pub async fn current_session(&self) -> Option<Session> {
        self.state.read().await.current_session().cloned()
    }

    pub async fn projects(&self) -> Vec<Project> {
        self.state.read().await.projects.list().to_vec()
    }

    pub async fn processing_status(&self) -> ProcessingStatus {
        let step = self.state.read().await.processing_step;
        let current = self.controller.current();
        ProcessingStatus {
            step,
            status: self.controller.status(),
            session_id: current.as_ref().and_then(|a| a.session_id.clone()),
            turn_id: current.and_then(|a| a.turn_id),
        }
    }

    // ============================================================================
    // Sessions
    // ============================================================================

    /// Cancels in-flight work and clears the selection; the next submitted
    /// message opens a fresh session.
    pub async fn start_new_session(&self) {
        self.cancel_generation().await;
        self.state.write().await.current_session_id = None;
    }

    /// Makes `id` the current session.
    pub async fn load_session(&self, id: &str) -> Result<Session> {
        self.cancel_generation().await;
        let snapshot = {
            let mut state = self.state.write().await;
            let session = state.require_session_mut(id)?;
            session.mark_accessed();
            let snapshot = session.clone();
            state.current_session_id = Some(id.to_string());
            snapshot
        };
        self.persist(&snapshot).await;
        Ok(snapshot)
    }

    pub async fn rename_session(&self, id: &str, title: impl Into<String>) -> Result<()> {
        let snapshot = {
            let mut state = self.state.write().await;
            let session = state.require_session_mut(id)?;
            session.title = title.into();
            session.touch();
            session.clone()
        };
        self.persist(&snapshot).await;
        Ok(())
    }

    /// Removes a session, cancelling its attempt if one is in flight.
    pub async fn delete_session(&self, id: &str) -> Result<()> {
        self.controller.cancel_for_session(id);
        {
            let mut state = self.state.write().await;
            state
                .remove_session(id)
                .ok_or_else(|| ProcflowError::not_found("Session", id))?;
            if self.controller.current().is_none() {
                state.processing_step = ProcessingStep::Idle;
            }
        }
        tracing::debug!(session_id = %id, "Session deleted");
        if let Err(e) = self.sync.delete_session(id).await {
            tracing::warn!(session_id = %id, "Failed to persist session deletion: {}", e);
        }
        Ok(())
    }

    /// Removes every session. Projects are kept.
    pub async fn delete_all_sessions(&self) {
        self.cancel_generation().await;
        {
            let mut state = self.state.write().await;
            state.sessions.clear();
            state.current_session_id = None;
        }
        if let Err(e) = self.sync.delete_all().await {
            tracing::warn!("Failed to persist history clear: {}", e);
        }
    }

    /// Reorders the session list by id and rewrites the stored collection.
    pub async fn reorder_history(&self, ordered_ids: &[String]) {
        let sessions = {
            let mut state = self.state.write().await;
            state.reorder(ordered_ids);
            state.sessions.clone()
        };
        if let Err(e) = self.sync.replace_all(&sessions).await {
            tracing::warn!("Failed to persist session order: {}", e);
        }
    }

    /// Moves a session into a project, or out of any with `None`.
    pub async fn move_session_to_project(
        &self,
        session_id: &str,
        project_id: Option<&str>,
    ) -> Result<()> {
        let snapshot = {
            let mut guard = self.state.write().await;
            let state = &mut *guard;
            let session = state
                .sessions
                .iter_mut()
                .find(|s| s.id == session_id)
                .ok_or_else(|| ProcflowError::not_found("Session", session_id))?;
            state.projects.assign(session, project_id)?;
            session.clone()
        };
        self.persist(&snapshot).await;
        Ok(())
    }

    /// The session as pretty-printed JSON, in its persisted shape.
    pub async fn export_session(&self, id: &str) -> Result<String> {
        let state = self.state.read().await;
        let session = state
            .session(id)
            .ok_or_else(|| ProcflowError::not_found("Session", id))?;
        Ok(serde_json::to_string_pretty(session)?)
    }

    // ============================================================================
    // Projects
    // ============================================================================

    pub async fn create_project(
        &self,
        name: impl Into<String>,
        color: impl Into<String>,
    ) -> Project {
        let project = self.state.write().await.projects.create(name, color);
        tracing::debug!(project_id = %project.id, name = %project.name, "Project created");
        if let Err(e) = self.sync.create_project(&project).await {
            tracing::warn!(project_id = %project.id, "Failed to persist project: {}", e);
        }
        project
    }

    pub async fn rename_project(&self, id: &str, name: impl Into<String>) -> Result<Project> {
        let project = self.state.write().await.projects.rename(id, name)?.clone();
        if let Err(e) = self.sync.rename_project(id, &project.name).await {
            tracing::warn!(project_id = %id, "Failed to persist project rename: {}", e);
        }
        Ok(project)
    }

    /// Deletes a project and detaches its sessions, in memory and on disk.
    /// Returns the number of sessions detached.
    pub async fn delete_project(&self, id: &str) -> Result<usize> {
        let detached = {
            let mut guard = self.state.write().await;
            let state = &mut *guard;
            let (_, detached) = state.projects.remove(id, &mut state.sessions)?;
            detached
        };
        tracing::debug!(project_id = %id, detached, "Project deleted");
        if let Err(e) = self.sync.delete_project(id).await {
            tracing::warn!(project_id = %id, "Failed to persist project deletion: {}", e);
        }
        Ok(detached)
    }

    /// Best-effort upsert of one session.
    async fn persist(&self, session: &Session) {
        if let Err(e) = self.sync.save_session(session).await {
            tracing::warn!(session_id = %session.id, "Failed to persist session: {}", e);
        }
    }
}
