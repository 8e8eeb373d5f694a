//! Conversation domain module.
//!
//! # Module Structure
//!
//! - `version`: the Version Store (`MessageVersion`, `VersionStack`)
//! - `turn`: a user/assistant pair and its lifecycle (`Turn`, `TurnStatus`)
//! - `session`: an ordered sequence of turns plus metadata (`Session`)

mod session;
mod turn;
mod version;

pub use session::{DEFAULT_SESSION_TITLE, Session};
pub use turn::{Turn, TurnSide, TurnStatus};
pub use version::{MessageVersion, VersionError, VersionKind, VersionStack};
