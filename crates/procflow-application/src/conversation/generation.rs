//! Turn actions and the generation pipeline.

use super::ConversationService;
use crate::state::ProcessingStep;
use procflow_core::conversation::{Session, Turn, TurnSide, TurnStatus, VersionKind};
use procflow_core::error::{ProcflowError, Result};
use procflow_core::process_model::AgentResponse;
use procflow_execution::{AttemptHandle, AttemptOutcome, Guarded};

/// How one generation attempt ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    /// The placeholder was filled with the answer.
    Done,
    /// The placeholder now carries the failure message.
    Failed { message: String },
    /// Superseded or cancelled; nothing was written after the placeholder.
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationReport {
    pub session_id: String,
    pub turn_id: String,
    pub outcome: GenerationOutcome,
}

impl ConversationService {
    /// Adds a turn to the current session (creating one if needed) and
    /// generates its answer.
    pub async fn submit_user_message(&self, text: impl Into<String>) -> Result<GenerationReport> {
        self.cancel_generation().await;

        let (session_id, turn_id, snapshot) = {
            let mut state = self.state.write().await;
            let session_id = state.ensure_current_session();
            let session = state.require_session_mut(&session_id)?;
            let turn = Turn::new(text);
            let turn_id = turn.id.clone();
            session.push_turn(turn);
            (session_id, turn_id, session.clone())
        };
        tracing::debug!(session_id = %session_id, turn_id = %turn_id, "Turn submitted");
        self.persist(&snapshot).await;

        self.generate(&session_id, &turn_id).await
    }

    /// Records a new user version on a turn of the current session and
    /// generates a fresh answer for it.
    pub async fn edit_turn(
        &self,
        turn_id: &str,
        text: impl Into<String>,
    ) -> Result<GenerationReport> {
        self.cancel_generation().await;

        let (session_id, snapshot) = {
            let mut state = self.state.write().await;
            let session_id = state.require_current_id()?;
            let session = state.require_session_mut(&session_id)?;
            let turn = session
                .turn_mut(turn_id)
                .ok_or_else(|| ProcflowError::not_found("Turn", turn_id))?;
            let index = turn.edit(text);
            tracing::debug!(turn_id = %turn_id, index, "Turn edited");
            session.touch();
            (session_id, session.clone())
        };
        self.persist(&snapshot).await;

        self.generate(&session_id, turn_id).await
    }

    /// Generates another answer from the turn's active user version.
    pub async fn regenerate_turn(&self, turn_id: &str) -> Result<GenerationReport> {
        self.cancel_generation().await;

        let session_id = {
            let state = self.state.read().await;
            let session_id = state.require_current_id()?;
            let known = state
                .session(&session_id)
                .is_some_and(|session| session.turn(turn_id).is_some());
            if !known {
                return Err(ProcflowError::not_found("Turn", turn_id));
            }
            session_id
        };

        self.generate(&session_id, turn_id).await
    }

    /// Selects which version of one side of a turn is active.
    pub async fn set_turn_version(&self, turn_id: &str, side: TurnSide, index: usize) -> Result<()> {
        let snapshot = {
            let mut state = self.state.write().await;
            let session_id = state.require_current_id()?;
            let session = state.require_session_mut(&session_id)?;
            session
                .turn_mut(turn_id)
                .ok_or_else(|| ProcflowError::not_found("Turn", turn_id))?
                .stack_mut(side)
                .set_active(index)?;
            session.clone()
        };
        self.persist(&snapshot).await;
        Ok(())
    }

    /// Aborts the in-flight attempt, if any. Returns whether one was running.
    pub async fn cancel_generation(&self) -> bool {
        let cancelled = self.controller.cancel();
        if cancelled {
            self.state.write().await.processing_step = ProcessingStep::Idle;
        }
        cancelled
    }

    /// Runs one attempt for `turn_id`: optimistic placeholder, guarded
    /// collaborator call, then the terminal commit.
    pub(super) async fn generate(&self, session_id: &str, turn_id: &str) -> Result<GenerationReport> {
        let (handle, placeholder, prompt, snapshot) = {
            let mut state = self.state.write().await;
            let session = state.require_session_mut(session_id)?;
            let turn = session
                .turn_mut(turn_id)
                .ok_or_else(|| ProcflowError::not_found("Turn", turn_id))?;
            let prompt = turn
                .prompt()
                .map(str::to_string)
                .ok_or_else(|| ProcflowError::internal(format!("Turn {} has no user text", turn_id)))?;

            let handle = self.controller.begin_attempt(session_id, turn_id);
            let placeholder = turn.begin_generation();
            session.touch();
            let snapshot = session.clone();
            state.processing_step = ProcessingStep::Analyzing;
            (handle, placeholder, prompt, snapshot)
        };
        tracing::info!(
            token = %handle.token(),
            session_id = %session_id,
            turn_id = %turn_id,
            placeholder,
            "Generation started"
        );
        self.persist(&snapshot).await;

        let report = |outcome| GenerationReport {
            session_id: session_id.to_string(),
            turn_id: turn_id.to_string(),
            outcome,
        };

        if !self.controller.is_current(handle.token()) {
            return Ok(report(GenerationOutcome::Cancelled));
        }

        let guarded = self
            .controller
            .guard(&handle, self.generator.generate(&prompt))
            .await;

        let resolved = match guarded {
            Guarded::Cancelled => {
                tracing::debug!(token = %handle.token(), "Generation abandoned");
                return Ok(report(GenerationOutcome::Cancelled));
            }
            Guarded::TimedOut(timeout) => Err(ProcflowError::generation(format!(
                "Generation timed out after {} seconds",
                timeout.as_secs()
            ))),
            Guarded::Completed(result) => result,
        };

        if !self.controller.is_current(handle.token()) {
            return Ok(report(GenerationOutcome::Cancelled));
        }

        let outcome = self
            .commit_attempt(&handle, session_id, turn_id, placeholder, resolved)
            .await?;
        Ok(report(outcome))
    }

    /// Applies the terminal transition if `handle` is still current, then
    /// persists it.
    async fn commit_attempt(
        &self,
        handle: &AttemptHandle,
        session_id: &str,
        turn_id: &str,
        placeholder: usize,
        resolved: Result<AgentResponse>,
    ) -> Result<GenerationOutcome> {
        let duration_ms = u64::try_from(handle.elapsed().as_millis()).unwrap_or(u64::MAX);

        let committed = {
            let mut state = self.state.write().await;
            if !self.controller.is_current(handle.token()) {
                return Ok(GenerationOutcome::Cancelled);
            }
            state.processing_step = ProcessingStep::Idle;

            let applied = state
                .require_session_mut(session_id)
                .and_then(|session| {
                    let outcome = apply_result(session, turn_id, placeholder, resolved, duration_ms)?;
                    session.touch();
                    Ok((outcome, session.clone()))
                });

            let attempt_outcome = match &applied {
                Ok((GenerationOutcome::Done, _)) => AttemptOutcome::Succeeded,
                _ => AttemptOutcome::Failed,
            };
            self.controller.finish(handle.token(), attempt_outcome);
            applied
        };

        let (outcome, snapshot) = committed.map_err(|e| {
            tracing::error!(token = %handle.token(), "Failed to commit generation result: {}", e);
            ProcflowError::internal(e.to_string())
        })?;

        match &outcome {
            GenerationOutcome::Failed { message } => {
                tracing::info!(token = %handle.token(), duration_ms, "Generation failed: {}", message)
            }
            _ => tracing::info!(token = %handle.token(), duration_ms, "Generation finished"),
        }
        self.persist(&snapshot).await;
        Ok(outcome)
    }
}

/// Fills the placeholder with the answer or the failure message.
fn apply_result(
    session: &mut Session,
    turn_id: &str,
    placeholder: usize,
    resolved: Result<AgentResponse>,
    duration_ms: u64,
) -> Result<GenerationOutcome> {
    let answer = resolved.and_then(|response| {
        let (content, kind) = response.to_version_content()?;
        Ok((content, kind, response.process_model))
    });

    let turn = session
        .turn_mut(turn_id)
        .ok_or_else(|| ProcflowError::not_found("Turn", turn_id))?;

    match answer {
        Ok((content, kind, model)) => {
            turn.assistant
                .update_at(placeholder, content, kind, Some(duration_ms))?;
            turn.status = TurnStatus::Done;
            turn.duration_ms = Some(duration_ms);
            if model.is_some() {
                session.model = model;
            }
            Ok(GenerationOutcome::Done)
        }
        Err(e) => {
            let message = e.to_string();
            turn.assistant
                .update_at(placeholder, message.clone(), VersionKind::Error, Some(duration_ms))?;
            turn.status = TurnStatus::Error;
            turn.duration_ms = Some(duration_ms);
            Ok(GenerationOutcome::Failed { message })
        }
    }
}
