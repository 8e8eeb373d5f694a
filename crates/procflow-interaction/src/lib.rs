//! Clients for the external model service.

pub mod gemini_client;

pub use gemini_client::GeminiClient;
