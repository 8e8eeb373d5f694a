//! Turn: one user message paired with its assistant responses.

use super::version::{VersionKind, VersionStack};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Lifecycle of a turn.
///
/// `Pending -> Generating -> {Done, Error}`. Edit and regenerate move a
/// `Done`/`Error` turn back to `Generating`; nothing returns to `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnStatus {
    #[default]
    Pending,
    Generating,
    Done,
    Error,
}

impl fmt::Display for TurnStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TurnStatus::Pending => "pending",
            TurnStatus::Generating => "generating",
            TurnStatus::Done => "done",
            TurnStatus::Error => "error",
        };
        f.write_str(label)
    }
}

/// Which side of a turn a version operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnSide {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub id: String,
    pub user: VersionStack,
    #[serde(default)]
    pub assistant: VersionStack,
    #[serde(default)]
    pub status: TurnStatus,
    #[serde(
        rename = "executionDuration",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub duration_ms: Option<u64>,
}

impl Turn {
    /// Creates a submitted turn: one active user version, no assistant
    /// versions yet.
    pub fn new(user_text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user: VersionStack::with_initial(user_text, VersionKind::Text),
            assistant: VersionStack::new(),
            status: TurnStatus::Pending,
            duration_ms: None,
        }
    }

    pub fn stack(&self, side: TurnSide) -> &VersionStack {
        match side {
            TurnSide::User => &self.user,
            TurnSide::Assistant => &self.assistant,
        }
    }

    pub fn stack_mut(&mut self, side: TurnSide) -> &mut VersionStack {
        match side {
            TurnSide::User => &mut self.user,
            TurnSide::Assistant => &mut self.assistant,
        }
    }

    /// Text sent to the generator for this turn.
    pub fn prompt(&self) -> Option<&str> {
        self.user.active_content()
    }

    /// Records an edit: a new active user version. Assistant history is left
    /// untouched until the next generation appends to it.
    pub fn edit(&mut self, text: impl Into<String>) -> usize {
        self.user.push_active(text, VersionKind::Text)
    }

    /// Appends the empty assistant placeholder for a new attempt and enters
    /// `Generating`. Returns the placeholder index.
    pub fn begin_generation(&mut self) -> usize {
        let index = self.assistant.push_active("", VersionKind::Text);
        self.status = TurnStatus::Generating;
        index
    }
}
