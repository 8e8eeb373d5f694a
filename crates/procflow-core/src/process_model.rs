//! Process model produced by the generation collaborator.

use crate::conversation::VersionKind;
use crate::error::{ProcflowError, Result};
use serde::{Deserialize, Serialize};

/// Kind of a step in a process graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepType {
    Start,
    #[default]
    Action,
    Decision,
    End,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessStep {
    pub id: String,
    #[serde(rename = "type", default)]
    pub step_type: StepType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
    #[serde(default)]
    pub description: String,
    /// IDs of the following steps
    #[serde(default)]
    pub next: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProcessModel {
    #[serde(default)]
    pub process_name: String,
    #[serde(default)]
    pub actors: Vec<String>,
    #[serde(default)]
    pub steps: Vec<ProcessStep>,
}

/// Whether the assistant extracted a process or answered a general question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseKind {
    #[default]
    Process,
    General,
}

/// Result of one generation call.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AgentResponse {
    #[serde(rename = "type", default)]
    pub kind: ResponseKind,
    #[serde(default)]
    pub text_response: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process_model: Option<ProcessModel>,
}

impl AgentResponse {
    pub fn general(text: impl Into<String>) -> Self {
        Self {
            kind: ResponseKind::General,
            text_response: text.into(),
            process_model: None,
        }
    }

    pub fn process(summary: impl Into<String>, model: ProcessModel) -> Self {
        Self {
            kind: ResponseKind::Process,
            text_response: summary.into(),
            process_model: Some(model),
        }
    }

    /// Parses the raw JSON text returned by a model.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ProcflowError::generation("No content received from AI"));
        }
        serde_json::from_str(trimmed)
            .map_err(|e| ProcflowError::generation(format!("Unparsable model response: {}", e)))
    }

    /// Content and kind stored in the assistant version.
    ///
    /// General answers are kept as text; process answers store the model as
    /// pretty JSON (the whole response when the model is missing).
    pub fn to_version_content(&self) -> Result<(String, VersionKind)> {
        match self.kind {
            ResponseKind::General => Ok((self.text_response.clone(), VersionKind::Text)),
            ResponseKind::Process => {
                let content = match &self.process_model {
                    Some(model) => serde_json::to_string_pretty(model)?,
                    None => serde_json::to_string_pretty(self)?,
                };
                Ok((content, VersionKind::Map))
            }
        }
    }
}
