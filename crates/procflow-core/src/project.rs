//! Project domain model.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user-defined label that groups sessions.
///
/// Sessions point at projects through `Session::project_id`; a project never
/// owns its sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    /// Hex code or a named palette entry
    pub color: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl Project {
    pub fn new(name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            color: color.into(),
            // Stored with millisecond precision.
            created_at: Utc::now().trunc_subsecs(3),
        }
    }
}
