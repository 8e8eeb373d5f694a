use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default bound on one generation or transcription call.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Root of `config.toml`.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct StorageConfig {
    /// Overrides the default `chat_history.json` location
    #[serde(default)]
    pub history_file: Option<PathBuf>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct GenerationConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Falls back to the `GOOGLE_API_KEY` environment variable
    #[serde(default)]
    pub api_key: Option<String>,
}

impl GenerationConfig {
    /// Bound on one attempt. A zero `timeout_secs` would expire every
    /// attempt immediately, so it falls back to the default.
    pub fn timeout(&self) -> Duration {
        match self.timeout_secs {
            0 => Duration::from_secs(default_timeout_secs()),
            secs => Duration::from_secs(secs),
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            timeout_secs: default_timeout_secs(),
            api_key: None,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Also write a daily-rolling log file under the logs directory
    #[serde(default)]
    pub file: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: false,
        }
    }
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_log_level() -> String {
    "info".to_string()
}
