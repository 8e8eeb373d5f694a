//! Durable history store interface.
//!
//! Defines the persisted document and the whole-document store the
//! application layer synchronizes with.

use crate::conversation::Session;
use crate::error::Result;
use crate::project::Project;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Everything that is persisted: all sessions and all projects.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HistoryDocument {
    #[serde(default)]
    pub sessions: Vec<Session>,
    #[serde(default)]
    pub projects: Vec<Project>,
}

impl HistoryDocument {
    pub fn new(sessions: Vec<Session>, projects: Vec<Project>) -> Self {
        Self { sessions, projects }
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty() && self.projects.is_empty()
    }
}

/// An abstract store holding one [`HistoryDocument`].
///
/// Every write replaces the whole document ("last write wins"); there are no
/// partial updates and no transactions beyond that.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Reads the current document.
    ///
    /// # Returns
    ///
    /// - `Ok(HistoryDocument)`: the stored document (empty when nothing was
    ///   stored yet)
    /// - `Err(_)`: the store could not be read or parsed
    async fn read(&self) -> Result<HistoryDocument>;

    /// Replaces the stored document.
    async fn write(&self, document: &HistoryDocument) -> Result<()>;

    /// Moves an unparsable document out of the way so the next write starts
    /// from an empty one. Stores without a durable copy have nothing to keep.
    async fn set_aside(&self) -> Result<()> {
        Ok(())
    }
}
