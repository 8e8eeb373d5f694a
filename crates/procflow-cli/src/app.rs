//! Wiring of the configured store and model client into a service.

use anyhow::Result;
use async_trait::async_trait;
use procflow_application::ConversationService;
use procflow_core::config::AppConfig;
use procflow_core::error::{ProcflowError, Result as ProcflowResult};
use procflow_core::generation::{AudioInput, ProcessGenerator, Transcriber};
use procflow_core::history::HistoryStore;
use procflow_core::process_model::AgentResponse;
use procflow_infrastructure::{ConfigService, JsonHistoryStore};
use procflow_infrastructure::config_service::API_KEY_ENV;
use procflow_interaction::GeminiClient;
use std::path::PathBuf;
use std::sync::Arc;

pub fn config_service(path: Option<PathBuf>) -> Result<ConfigService> {
    match path {
        Some(path) => Ok(ConfigService::new(path)),
        None => Ok(ConfigService::default_location()?),
    }
}

pub fn build_service(config: &AppConfig) -> Result<ConversationService> {
    let store: Arc<dyn HistoryStore> = match &config.storage.history_file {
        Some(path) => Arc::new(JsonHistoryStore::new(path.clone())),
        None => Arc::new(JsonHistoryStore::default_location()?),
    };

    let (generator, transcriber): (Arc<dyn ProcessGenerator>, Arc<dyn Transcriber>) =
        match GeminiClient::from_config(&config.generation) {
            Ok(client) => {
                tracing::debug!(model = %client.model(), "Using Gemini client");
                let client = Arc::new(client);
                (client.clone(), client)
            }
            Err(e) => {
                tracing::debug!("Model client unavailable: {}", e);
                let missing = Arc::new(MissingCredentials);
                (missing.clone(), missing)
            }
        };

    Ok(ConversationService::new(
        store,
        generator,
        transcriber,
        config.generation.timeout(),
    ))
}

/// Stands in for the model client when no API key is configured, so history
/// commands keep working and generation fails with a readable message.
struct MissingCredentials;

impl MissingCredentials {
    fn error() -> ProcflowError {
        ProcflowError::config(format!(
            "No API key configured. Set {} or generation.api_key in config.toml",
            API_KEY_ENV
        ))
    }
}

#[async_trait]
impl ProcessGenerator for MissingCredentials {
    async fn generate(&self, _prompt: &str) -> ProcflowResult<AgentResponse> {
        Err(Self::error())
    }
}

#[async_trait]
impl Transcriber for MissingCredentials {
    async fn transcribe(&self, _audio: &AudioInput) -> ProcflowResult<String> {
        Err(Self::error())
    }
}
