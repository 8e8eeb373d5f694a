//! In-memory conversation state.

use crate::project_index::ProjectIndex;
use procflow_core::conversation::Session;
use procflow_core::error::{ProcflowError, Result};
use procflow_execution::ControllerStatus;
use serde::Serialize;

/// What the service is busy with, for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingStep {
    #[default]
    Idle,
    Analyzing,
    Transcribing,
}

/// Snapshot combining the processing step with the controller status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingStatus {
    pub step: ProcessingStep,
    pub status: ControllerStatus,
    pub session_id: Option<String>,
    pub turn_id: Option<String>,
}

/// Sessions (most recent first), projects and the current selection.
#[derive(Debug, Clone, Default)]
pub struct ConversationState {
    pub sessions: Vec<Session>,
    pub projects: ProjectIndex,
    pub current_session_id: Option<String>,
    pub processing_step: ProcessingStep,
}

impl ConversationState {
    pub fn session(&self, id: &str) -> Option<&Session> {
        self.sessions.iter().find(|s| s.id == id)
    }

    pub fn session_mut(&mut self, id: &str) -> Option<&mut Session> {
        self.sessions.iter_mut().find(|s| s.id == id)
    }

    pub fn require_session_mut(&mut self, id: &str) -> Result<&mut Session> {
        self.session_mut(id)
            .ok_or_else(|| ProcflowError::not_found("Session", id))
    }

    pub fn current_session(&self) -> Option<&Session> {
        self.current_session_id
            .as_deref()
            .and_then(|id| self.session(id))
    }

    /// Id of the current session, creating an empty one at the front when
    /// none is selected.
    pub fn ensure_current_session(&mut self) -> String {
        if let Some(id) = self
            .current_session_id
            .as_deref()
            .filter(|id| self.session(id).is_some())
        {
            return id.to_string();
        }
        let session = Session::new();
        let id = session.id.clone();
        tracing::debug!(session_id = %id, "Creating session");
        self.sessions.insert(0, session);
        self.current_session_id = Some(id.clone());
        id
    }

    /// Id of the current session, or `NoActiveSession`.
    pub fn require_current_id(&self) -> Result<String> {
        self.current_session()
            .map(|s| s.id.clone())
            .ok_or(ProcflowError::NoActiveSession)
    }

    pub fn remove_session(&mut self, id: &str) -> Option<Session> {
        let position = self.sessions.iter().position(|s| s.id == id)?;
        if self.current_session_id.as_deref() == Some(id) {
            self.current_session_id = None;
        }
        Some(self.sessions.remove(position))
    }

    /// Reorders sessions by `ordered_ids`. Unknown ids are ignored; sessions
    /// missing from the list keep their relative order after the listed ones.
    pub fn reorder(&mut self, ordered_ids: &[String]) {
        let mut remaining = std::mem::take(&mut self.sessions);
        let mut ordered = Vec::with_capacity(remaining.len());
        for id in ordered_ids {
            if let Some(position) = remaining.iter().position(|s| &s.id == id) {
                ordered.push(remaining.remove(position));
            }
        }
        ordered.append(&mut remaining);
        self.sessions = ordered;
    }
}
