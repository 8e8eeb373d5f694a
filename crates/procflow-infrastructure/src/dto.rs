//! On-disk shapes of the history document.
//!
//! ### History Document Formats
//! - **legacy**: a bare JSON array of sessions, written before projects existed
//! - **current**: `{ "sessions": [...], "projects": [...] }`
//!
//! Both are accepted on read; only the current shape is ever written.

use procflow_core::conversation::Session;
use procflow_core::history::HistoryDocument;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoredDocument {
    Legacy(Vec<Session>),
    Current(HistoryDocument),
}

impl From<StoredDocument> for HistoryDocument {
    fn from(stored: StoredDocument) -> Self {
        match stored {
            StoredDocument::Legacy(sessions) => {
                tracing::debug!(count = sessions.len(), "Upgrading legacy history document");
                HistoryDocument::new(sessions, Vec::new())
            }
            StoredDocument::Current(document) => document,
        }
    }
}

impl From<HistoryDocument> for StoredDocument {
    fn from(document: HistoryDocument) -> Self {
        StoredDocument::Current(document)
    }
}
