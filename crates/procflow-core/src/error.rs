//! Error types for procflow.

use crate::conversation::VersionError;
use serde::Serialize;
use thiserror::Error;

/// A shared error type for the whole workspace.
///
/// Collaborator failures (generation, transcription, storage) are converted
/// into these variants at crate boundaries so callers only ever match on one
/// enum.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
pub enum ProcflowError {
    /// Entity not found error with type information
    #[error("Entity not found: {entity_type} '{id}'")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization {
        format: String, // "TOML", "JSON"
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// The generation collaborator failed or returned an unusable result
    #[error("{0}")]
    Generation(String),

    /// The transcription collaborator failed
    #[error("Transcription failed: {0}")]
    Transcription(String),

    /// Durable storage could not be read or written
    #[error("Persistence unavailable: {0}")]
    PersistenceUnavailable(String),

    /// The attempt was superseded or cancelled before it produced anything
    #[error("Cancelled")]
    Cancelled,

    /// A version index outside the stack bounds
    #[error("Version index {index} out of range (len {len})")]
    OutOfRange { index: usize, len: usize },

    /// An action that needs a current session was issued without one
    #[error("No active session")]
    NoActiveSession,

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ProcflowError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a NotFound error
    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    /// Creates an IO error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates a Generation error
    pub fn generation(message: impl Into<String>) -> Self {
        Self::Generation(message.into())
    }

    /// Creates a Transcription error
    pub fn transcription(message: impl Into<String>) -> Self {
        Self::Transcription(message.into())
    }

    /// Creates a PersistenceUnavailable error
    pub fn persistence(message: impl Into<String>) -> Self {
        Self::PersistenceUnavailable(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Check if this is a NotFound error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is a cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Check if this is a serialization error
    pub fn is_serialization(&self) -> bool {
        matches!(self, Self::Serialization { .. })
    }

    /// Check if this error came from durable storage
    pub fn is_persistence(&self) -> bool {
        matches!(
            self,
            Self::PersistenceUnavailable(_) | Self::Io { .. } | Self::Serialization { .. }
        )
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for ProcflowError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for ProcflowError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for ProcflowError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<VersionError> for ProcflowError {
    fn from(err: VersionError) -> Self {
        match err {
            VersionError::OutOfRange { index, len } => Self::OutOfRange { index, len },
            VersionError::NotFound { index } => Self::not_found("MessageVersion", index.to_string()),
        }
    }
}

/// Conversion from anyhow::Error (used by collaborator implementations)
impl From<anyhow::Error> for ProcflowError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// A type alias for `Result<T, ProcflowError>`.
pub type Result<T> = std::result::Result<T, ProcflowError>;
