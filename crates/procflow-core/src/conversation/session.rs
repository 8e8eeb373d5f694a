//! Session: one conversation and its metadata.

use super::turn::Turn;
use crate::process_model::ProcessModel;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Title given to sessions until the first message names them.
pub const DEFAULT_SESSION_TITLE: &str = "New Chat";

const TITLE_MAX_CHARS: usize = 50;

/// One full conversation (ordered turns) plus metadata; the unit of
/// persistence.
///
/// `project_id` is a weak reference: removing the project nulls it, the
/// session itself is never deleted along with a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "StoredSession")]
pub struct Session {
    pub id: String,
    pub title: String,
    pub turns: Vec<Turn>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub updated_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub last_accessed_at: DateTime<Utc>,
    pub transcript: String,
    pub project_id: Option<String>,
    /// Most recent structured model produced in this session.
    pub model: Option<ProcessModel>,
}

/// On-disk shape; older documents omit most metadata.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredSession {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    turns: Vec<Turn>,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    updated_at: Option<DateTime<Utc>>,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    last_accessed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    transcript: Option<String>,
    #[serde(default)]
    project_id: Option<String>,
    #[serde(default)]
    model: Option<ProcessModel>,
}

impl From<StoredSession> for Session {
    fn from(stored: StoredSession) -> Self {
        let created_at = stored.created_at.unwrap_or_else(Utc::now);
        let updated_at = stored.updated_at.unwrap_or(created_at);
        Self {
            id: stored.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            title: stored
                .title
                .unwrap_or_else(|| DEFAULT_SESSION_TITLE.to_string()),
            turns: stored.turns,
            created_at,
            updated_at,
            last_accessed_at: stored.last_accessed_at.unwrap_or(updated_at),
            transcript: stored.transcript.unwrap_or_default(),
            project_id: stored.project_id,
            model: stored.model,
        }
    }
}

impl Session {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            title: DEFAULT_SESSION_TITLE.to_string(),
            turns: Vec::new(),
            created_at: now,
            updated_at: now,
            last_accessed_at: now,
            transcript: String::new(),
            project_id: None,
            model: None,
        }
    }

    pub fn turn(&self, turn_id: &str) -> Option<&Turn> {
        self.turns.iter().find(|turn| turn.id == turn_id)
    }

    pub fn turn_mut(&mut self, turn_id: &str) -> Option<&mut Turn> {
        self.turns.iter_mut().find(|turn| turn.id == turn_id)
    }

    /// Appends a turn and records the submitted text as the transcript.
    pub fn push_turn(&mut self, turn: Turn) {
        if let Some(text) = turn.prompt() {
            self.transcript = text.to_string();
            self.apply_default_title(text);
        }
        self.turns.push(turn);
        self.touch();
    }

    /// Names a still-untitled session after its first message.
    pub fn apply_default_title(&mut self, text: &str) {
        if self.title != DEFAULT_SESSION_TITLE {
            return;
        }
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return;
        }
        let head: String = trimmed.chars().take(TITLE_MAX_CHARS).collect();
        self.title = if trimmed.chars().count() > TITLE_MAX_CHARS {
            format!("{}...", head)
        } else {
            head
        };
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn mark_accessed(&mut self) {
        self.last_accessed_at = Utc::now();
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
