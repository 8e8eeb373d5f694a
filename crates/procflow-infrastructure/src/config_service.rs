//! Configuration service implementation.
//!
//! Loads [`AppConfig`] from `config.toml` and caches it.

use crate::paths::ProcflowPaths;
use procflow_core::config::AppConfig;
use procflow_core::error::Result;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

/// Environment variable that overrides `generation.api_key`.
pub const API_KEY_ENV: &str = "GOOGLE_API_KEY";

/// Loads and caches the application configuration.
///
/// A missing file yields the defaults; an unreadable or invalid file is
/// logged and also falls back to the defaults.
#[derive(Debug, Clone)]
pub struct ConfigService {
    path: PathBuf,
    config: Arc<RwLock<Option<AppConfig>>>,
}

impl ConfigService {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            config: Arc::new(RwLock::new(None)),
        }
    }

    /// Service reading `config.toml` from the platform config directory.
    pub fn default_location() -> Result<Self> {
        Ok(Self::new(ProcflowPaths::default().config_file()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Gets the configuration, loading from file if not cached.
    pub fn get_config(&self) -> AppConfig {
        {
            let read_lock = self.config.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(ref cached) = *read_lock {
                return cached.clone();
            }
        }

        let loaded = match Self::load_config(&self.path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), "Falling back to default config: {}", e);
                AppConfig::default()
            }
        };
        let loaded = apply_env_overrides(loaded, std::env::var(API_KEY_ENV).ok());

        let mut write_lock = self.config.write().unwrap_or_else(PoisonError::into_inner);
        *write_lock = Some(loaded.clone());
        loaded
    }

    /// Invalidates the cache, forcing a reload on next access.
    pub fn invalidate_cache(&self) {
        let mut write_lock = self.config.write().unwrap_or_else(PoisonError::into_inner);
        *write_lock = None;
    }

    fn load_config(path: &Path) -> Result<AppConfig> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(AppConfig::default());
        }
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }
}

/// A non-empty environment key wins over the configured one.
fn apply_env_overrides(mut config: AppConfig, env_api_key: Option<String>) -> AppConfig {
    if let Some(key) = env_api_key.filter(|key| !key.trim().is_empty()) {
        config.generation.api_key = Some(key);
    }
    config
}
