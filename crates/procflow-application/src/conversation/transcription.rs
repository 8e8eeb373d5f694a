//! Audio upload: transcribe, then submit the transcript as a user message.

use super::{ConversationService, GenerationReport};
use crate::state::ProcessingStep;
use procflow_core::error::{ProcflowError, Result};
use procflow_core::generation::AudioInput;
use procflow_execution::{AttemptOutcome, Guarded};

impl ConversationService {
    /// Transcribes `audio` and submits the text like a typed message.
    ///
    /// The transcription runs as its own attempt: cancelling it, or starting
    /// any other attempt meanwhile, returns [`ProcflowError::Cancelled`] and
    /// nothing is submitted. On failure (including an empty transcript) the
    /// controller reports an error and no turn is created.
    pub async fn upload_audio(&self, audio: AudioInput) -> Result<GenerationReport> {
        let handle = {
            let mut state = self.state.write().await;
            let handle = self
                .controller
                .begin_transcription(state.current_session_id.clone());
            state.processing_step = ProcessingStep::Transcribing;
            handle
        };
        tracing::info!(
            token = %handle.token(),
            file = %audio.file_name,
            mime_type = %audio.mime_type,
            "Transcribing audio"
        );

        let guarded = self
            .controller
            .guard(&handle, self.transcriber.transcribe(&audio))
            .await;
        let transcript = match guarded {
            Guarded::Cancelled => {
                tracing::debug!(token = %handle.token(), "Transcription abandoned");
                return Err(ProcflowError::Cancelled);
            }
            Guarded::TimedOut(timeout) => Err(ProcflowError::transcription(format!(
                "Transcription timed out after {} seconds",
                timeout.as_secs()
            ))),
            Guarded::Completed(Ok(text)) if !text.trim().is_empty() => Ok(text.trim().to_string()),
            Guarded::Completed(Ok(_)) => {
                Err(ProcflowError::transcription("Transcription returned no text"))
            }
            Guarded::Completed(Err(e)) => Err(e),
        };

        {
            let mut state = self.state.write().await;
            let outcome = match &transcript {
                Ok(_) => AttemptOutcome::Succeeded,
                Err(_) => AttemptOutcome::Failed,
            };
            if !self.controller.finish(handle.token(), outcome) {
                return Err(ProcflowError::Cancelled);
            }
            state.processing_step = ProcessingStep::Idle;
        }

        match transcript {
            Ok(text) => self.submit_user_message(text).await,
            Err(e) => {
                tracing::warn!(file = %audio.file_name, "Transcription failed: {}", e);
                Err(e)
            }
        }
    }
}
