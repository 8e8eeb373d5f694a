//! Domain layer for procflow.
//!
//! Holds the conversation model (versions, turns, sessions), projects, the
//! process model returned by the assistant, and the interfaces of the
//! external collaborators (generator, transcriber, durable store).

pub mod config;
pub mod conversation;
pub mod error;
pub mod generation;
pub mod history;
pub mod process_model;
pub mod project;

// Re-export common error type
pub use error::{ProcflowError, Result};
