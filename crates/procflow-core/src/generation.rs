//! Generation and transcription collaborator interfaces.

use crate::error::Result;
use crate::process_model::AgentResponse;
use async_trait::async_trait;

/// Asks an external model to answer a prompt.
///
/// Implementations must be cancel-safe: the caller aborts an in-flight
/// request by dropping the returned future.
#[async_trait]
pub trait ProcessGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<AgentResponse>;
}

/// Audio handed to a [`Transcriber`].
#[derive(Debug, Clone)]
pub struct AudioInput {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl AudioInput {
    /// Mime type used when the caller cannot determine one.
    pub const DEFAULT_MIME_TYPE: &'static str = "audio/mp3";

    pub fn new(file_name: impl Into<String>, mime_type: Option<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.unwrap_or_else(|| Self::DEFAULT_MIME_TYPE.to_string()),
            bytes,
        }
    }
}

/// Turns recorded audio into text.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio: &AudioInput) -> Result<String>;
}
