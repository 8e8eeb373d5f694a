//! Infrastructure layer for procflow.
//!
//! File-backed history storage, path resolution and configuration loading.

pub mod config_service;
pub mod dto;
pub mod json_history_store;
pub mod memory_history_store;
pub mod paths;
pub mod storage;

pub use crate::config_service::ConfigService;
pub use crate::json_history_store::JsonHistoryStore;
pub use crate::memory_history_store::InMemoryHistoryStore;
pub use crate::paths::ProcflowPaths;
