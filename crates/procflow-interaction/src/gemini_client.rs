//! GeminiClient - Direct REST API client for Gemini.
//!
//! Serves both collaborators: process generation (JSON response mode) and
//! audio transcription (inline base64 audio).

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use procflow_core::config::{DEFAULT_MODEL, GenerationConfig};
use procflow_core::error::{ProcflowError, Result};
use procflow_core::generation::{AudioInput, ProcessGenerator, Transcriber};
use procflow_core::process_model::AgentResponse;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

const TRANSCRIBE_INSTRUCTION: &str = "Transcribe this audio file verbatim.";

const SYSTEM_PROMPT: &str = r#"
You are an expert Business Process Analyst and AI assistant.
Your goal is to EITHER extract a business process from the user's transcript OR answer their general question helpfully.

OUTPUT FORMAT:
You must return a STRICT JSON object with the following structure:
{
    "type": "process" | "general",
    "text_response": "A markdown formatted response to the user's question or a summary of the process.",
    "process_model": {
        "process_name": "string",
        "actors": ["string"],
        "steps": [
            {
                "id": "string",
                "type": "start" | "action" | "decision" | "end",
                "actor": "string",
                "description": "string",
                "next": ["string"]
            }
        ]
    }
}

RULES:
1. If the user asks a general question, set "type" to "general" and provide a helpful answer in "text_response". Leave "process_model" null.
2. If the user describes a process, set "type" to "process", provide a brief summary in "text_response", and fill "process_model".
3. Use 'decision' type for simple branching.
"#;

/// Client that talks to the Gemini HTTP API.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    /// Builds a client from the `[generation]` config section.
    pub fn from_config(config: &GenerationConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                ProcflowError::config(
                    "No Gemini API key: set GOOGLE_API_KEY or generation.api_key",
                )
            })?;
        let model = if config.model.trim().is_empty() {
            DEFAULT_MODEL.to_string()
        } else {
            config.model.clone()
        };
        Ok(Self::new(api_key, model))
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn send_request(&self, body: &GenerateContentRequest) -> std::result::Result<String, String> {
        let url = format!(
            "{}/{model}:generateContent?key={api_key}",
            BASE_URL,
            model = self.model,
            api_key = self.api_key
        );

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|err| format!("Gemini API request failed: {}", err.without_url()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read Gemini error body".to_string());
            return Err(map_http_error(status, &body_text));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|err| format!("Failed to parse Gemini response: {}", err.without_url()))?;

        extract_text_response(parsed)
    }
}

#[async_trait]
impl ProcessGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<AgentResponse> {
        tracing::debug!(model = %self.model, "Requesting process generation");
        let request = process_request(prompt);
        let raw = self
            .send_request(&request)
            .await
            .map_err(ProcflowError::generation)?;
        AgentResponse::parse(&raw)
    }
}

#[async_trait]
impl Transcriber for GeminiClient {
    async fn transcribe(&self, audio: &AudioInput) -> Result<String> {
        tracing::debug!(
            model = %self.model,
            file = %audio.file_name,
            bytes = audio.bytes.len(),
            "Requesting transcription"
        );
        let request = transcription_request(audio);
        self.send_request(&request)
            .await
            .map_err(ProcflowError::transcription)
    }
}

fn process_request(prompt: &str) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: vec![Content {
            role: "user".to_string(),
            parts: vec![Part::Text {
                text: format!("{}\n\nUSER INPUT:\n{}", SYSTEM_PROMPT, prompt),
            }],
        }],
        generation_config: Some(GenerationSettings {
            response_mime_type: "application/json".to_string(),
        }),
    }
}

fn transcription_request(audio: &AudioInput) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: vec![Content {
            role: "user".to_string(),
            parts: vec![
                Part::InlineData {
                    inline_data: InlineDataPayload {
                        mime_type: audio.mime_type.clone(),
                        data: BASE64_STANDARD.encode(&audio.bytes),
                    },
                },
                Part::Text {
                    text: TRANSCRIBE_INSTRUCTION.to_string(),
                },
            ],
        }],
        generation_config: None,
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationSettings>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationSettings {
    response_mime_type: String,
}

#[derive(Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineDataPayload,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineDataPayload {
    mime_type: String,
    data: String,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<ContentResponse>,
}

#[derive(Deserialize)]
struct ContentResponse {
    #[serde(default)]
    parts: Vec<PartResponse>,
}

#[derive(Deserialize)]
struct PartResponse {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ErrorWrapper {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    status: Option<String>,
}

fn extract_text_response(response: GenerateContentResponse) -> std::result::Result<String, String> {
    response
        .candidates
        .and_then(|candidates| candidates.into_iter().next())
        .and_then(|candidate| candidate.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect::<String>()
        })
        .filter(|text| !text.is_empty())
        .ok_or_else(|| "No content received from AI".to_string())
}

fn map_http_error(status: StatusCode, body: &str) -> String {
    let detail = serde_json::from_str::<ErrorWrapper>(body)
        .map(|wrapper| {
            let status_text = wrapper.error.status.unwrap_or_default();
            let msg = wrapper.error.message.unwrap_or_else(|| body.to_string());
            if status_text.is_empty() {
                msg
            } else {
                format!("{status_text}: {msg}")
            }
        })
        .unwrap_or_else(|_| body.to_string());

    format!("Gemini API returned {}: {}", status.as_u16(), detail)
}
