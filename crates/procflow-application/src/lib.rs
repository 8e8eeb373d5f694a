//! Application layer for procflow.
//!
//! Wires the conversation model, the execution controller and durable
//! storage into the [`ConversationService`] action surface.

pub mod conversation;
pub mod history_sync;
pub mod project_index;
pub mod state;

pub use conversation::{ConversationService, GenerationOutcome, GenerationReport};
pub use history_sync::HistorySynchronizer;
pub use project_index::ProjectIndex;
pub use state::{ConversationState, ProcessingStatus, ProcessingStep};
