//! Path management for procflow files.
//!
//! # Directory Structure
//!
//! ```text
//! ~/.config/procflow/          # Config directory
//! ├── config.toml              # Application configuration
//! └── logs/                    # Application logs
//!     └── procflow.log.YYYY-MM-DD
//!
//! ~/.local/share/procflow/     # Data directory
//! └── chat_history.json        # Sessions and projects
//! ```

use procflow_core::ProcflowError;
use std::path::PathBuf;

const APP_DIR: &str = "procflow";
const HISTORY_FILE_NAME: &str = "chat_history.json";
const CONFIG_FILE_NAME: &str = "config.toml";

/// Errors that can occur during path resolution.
#[derive(Debug)]
pub enum PathError {
    /// The platform config or data directory could not be determined.
    HomeDirNotFound,
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::HomeDirNotFound => write!(f, "Cannot find home directory"),
        }
    }
}

impl std::error::Error for PathError {}

impl From<PathError> for ProcflowError {
    fn from(err: PathError) -> Self {
        ProcflowError::config(err.to_string())
    }
}

/// Resolves every procflow location.
///
/// With a base override all directories live under that base, which keeps
/// tests and portable installs out of the user's real config.
#[derive(Debug, Clone, Default)]
pub struct ProcflowPaths {
    base: Option<PathBuf>,
}

impl ProcflowPaths {
    pub fn new(base: Option<PathBuf>) -> Self {
        Self { base }
    }

    /// Returns the config directory (e.g. `~/.config/procflow/`).
    pub fn config_dir(&self) -> Result<PathBuf, PathError> {
        match &self.base {
            Some(base) => Ok(base.join("config")),
            None => dirs::config_dir()
                .map(|dir| dir.join(APP_DIR))
                .ok_or(PathError::HomeDirNotFound),
        }
    }

    /// Returns the data directory (e.g. `~/.local/share/procflow/`).
    pub fn data_dir(&self) -> Result<PathBuf, PathError> {
        match &self.base {
            Some(base) => Ok(base.join("data")),
            None => dirs::data_dir()
                .map(|dir| dir.join(APP_DIR))
                .ok_or(PathError::HomeDirNotFound),
        }
    }

    pub fn config_file(&self) -> Result<PathBuf, PathError> {
        Ok(self.config_dir()?.join(CONFIG_FILE_NAME))
    }

    /// Default location of the history document.
    pub fn history_file(&self) -> Result<PathBuf, PathError> {
        Ok(self.data_dir()?.join(HISTORY_FILE_NAME))
    }

    pub fn logs_dir(&self) -> Result<PathBuf, PathError> {
        Ok(self.config_dir()?.join("logs"))
    }
}
