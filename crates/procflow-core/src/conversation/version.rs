//! Version Store: the append-only history of one side of a turn.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// What a version's content represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionKind {
    /// Plain (markdown) text.
    #[default]
    Text,
    /// A structured process model serialized as JSON.
    Map,
    /// A failure message produced by a generation attempt.
    Error,
}

/// One alternate content for a user or assistant slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageVersion {
    pub id: String,
    pub content: String,
    #[serde(rename = "type", default)]
    pub kind: VersionKind,
    #[serde(rename = "timestamp", with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    #[serde(
        rename = "executionDuration",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub duration_ms: Option<u64>,
}

impl MessageVersion {
    pub fn new(content: impl Into<String>, kind: VersionKind) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            content: content.into(),
            kind,
            created_at: Utc::now(),
            duration_ms: None,
        }
    }
}

/// Index errors raised by [`VersionStack`].
///
/// Both indicate a caller holding a wrong index, never a runtime condition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionError {
    #[error("version index {index} out of range (len {len})")]
    OutOfRange { index: usize, len: usize },
    #[error("no version at index {index}")]
    NotFound { index: usize },
}

/// Ordered, append-only log of versions with a single active pointer.
///
/// `active_index` is `-1` only while the stack is empty; otherwise it always
/// points at an existing version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "StoredStack")]
pub struct VersionStack {
    versions: Vec<MessageVersion>,
    active_index: i64,
}

/// Shape read from disk before the active pointer is validated.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredStack {
    #[serde(default)]
    versions: Vec<MessageVersion>,
    #[serde(default = "empty_index")]
    active_index: i64,
}

fn empty_index() -> i64 {
    -1
}

impl From<StoredStack> for VersionStack {
    fn from(stored: StoredStack) -> Self {
        let len = stored.versions.len() as i64;
        let active_index = if len == 0 {
            -1
        } else {
            stored.active_index.clamp(0, len - 1)
        };
        Self {
            versions: stored.versions,
            active_index,
        }
    }
}

impl Default for VersionStack {
    fn default() -> Self {
        Self::new()
    }
}

impl VersionStack {
    /// An empty stack (`active_index == -1`).
    pub fn new() -> Self {
        Self {
            versions: Vec::new(),
            active_index: -1,
        }
    }

    /// A stack holding one active version.
    pub fn with_initial(content: impl Into<String>, kind: VersionKind) -> Self {
        let mut stack = Self::new();
        stack.push_active(content, kind);
        stack
    }

    /// Appends a version and returns its index. The active pointer only moves
    /// when the stack was empty.
    pub fn append(&mut self, content: impl Into<String>, kind: VersionKind) -> usize {
        self.versions.push(MessageVersion::new(content, kind));
        let index = self.versions.len() - 1;
        if self.active_index < 0 {
            self.active_index = index as i64;
        }
        index
    }

    /// Appends a version and makes it the active one.
    pub fn push_active(&mut self, content: impl Into<String>, kind: VersionKind) -> usize {
        let index = self.append(content, kind);
        self.active_index = index as i64;
        index
    }

    /// Moves the active pointer. Never changes the number of versions.
    pub fn set_active(&mut self, index: usize) -> Result<(), VersionError> {
        if index >= self.versions.len() {
            return Err(VersionError::OutOfRange {
                index,
                len: self.versions.len(),
            });
        }
        self.active_index = index as i64;
        Ok(())
    }

    /// Fills an existing version in place once its attempt resolves.
    pub fn update_at(
        &mut self,
        index: usize,
        content: impl Into<String>,
        kind: VersionKind,
        duration_ms: Option<u64>,
    ) -> Result<&MessageVersion, VersionError> {
        let version = self
            .versions
            .get_mut(index)
            .ok_or(VersionError::NotFound { index })?;
        version.content = content.into();
        version.kind = kind;
        version.duration_ms = duration_ms;
        Ok(version)
    }

    pub fn active_index(&self) -> Option<usize> {
        usize::try_from(self.active_index).ok()
    }

    pub fn active(&self) -> Option<&MessageVersion> {
        self.active_index().and_then(|index| self.versions.get(index))
    }

    pub fn active_content(&self) -> Option<&str> {
        self.active().map(|version| version.content.as_str())
    }

    pub fn get(&self, index: usize) -> Option<&MessageVersion> {
        self.versions.get(index)
    }

    pub fn versions(&self) -> &[MessageVersion] {
        &self.versions
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }
}
