//! Configuration service implementation.
//!
//! Loads the root configuration from `config.toml`, writing a default file
//! when none exists, and caches the result.

use crate::storage::AtomicTextFile;
use polyagent_core::config::RootConfig;
use polyagent_core::error::Result;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

/// Environment variable overriding `backend_base_url`.
pub const BACKEND_URL_ENV: &str = "POLYAGENT_BACKEND_URL";

/// Configuration service that loads and caches the root configuration.
#[derive(Debug, Clone)]
pub struct ConfigService {
    path: PathBuf,
    /// Cached configuration loaded from file.
    config: Arc<RwLock<Option<RootConfig>>>,
}

impl ConfigService {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            config: Arc::new(RwLock::new(None)),
        }
    }

    /// Gets the root configuration, loading from file if not cached.
    ///
    /// Falls back to defaults when the file cannot be read or parsed. The
    /// `POLYAGENT_BACKEND_URL` environment variable is applied on top.
    pub fn get_config(&self) -> RootConfig {
        {
            let read_lock = self.config.read().unwrap_or_else(|e| e.into_inner());
            if let Some(ref cached) = *read_lock {
                return cached.clone();
            }
        }

        let loaded = match self.load_config() {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(
                    "[ConfigService] Using default configuration, failed to load {}: {}",
                    self.path.display(),
                    e
                );
                RootConfig::default()
            }
        };
        let loaded = apply_env_overrides(loaded, std::env::var(BACKEND_URL_ENV).ok());

        {
            let mut write_lock = self.config.write().unwrap_or_else(|e| e.into_inner());
            *write_lock = Some(loaded.clone());
        }

        loaded
    }

    /// Invalidates the cache, forcing a reload on next access.
    pub fn invalidate_cache(&self) {
        let mut write_lock = self.config.write().unwrap_or_else(|e| e.into_inner());
        *write_lock = None;
    }

    /// Reads `config.toml`, creating it with defaults if it is missing.
    pub fn load_config(&self) -> Result<RootConfig> {
        let file = AtomicTextFile::new(self.path.clone());
        match file.load()? {
            Some(content) => Ok(toml::from_str(&content)?),
            None => {
                let default_config = RootConfig::default();
                file.save(&toml::to_string_pretty(&default_config)?)?;
                tracing::info!(
                    "[ConfigService] Created default configuration at {}",
                    self.path.display()
                );
                Ok(default_config)
            }
        }
    }
}

/// Applies environment overrides to a loaded configuration.
pub fn apply_env_overrides(mut config: RootConfig, backend_url: Option<String>) -> RootConfig {
    if let Some(url) = backend_url.filter(|url| !url.trim().is_empty()) {
        config.backend_base_url = url.trim().to_string();
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use polyagent_core::conversation::TurnBinding;

    #[test]
    fn test_creates_default_file_when_missing() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");
        let service = ConfigService::new(path.clone());

        let config = service.load_config().unwrap();

        assert_eq!(config, RootConfig::default());
        assert!(path.exists());
        let written: RootConfig = toml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written, config);
    }

    #[test]
    fn test_reads_existing_file_and_caches() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "default_agent = \"shopping\"\nturn_binding = \"follow_active\"\n")
            .unwrap();
        let service = ConfigService::new(path.clone());

        let config = service.load_config().unwrap();
        assert_eq!(config.default_agent, "shopping");
        assert_eq!(config.turn_binding, TurnBinding::FollowActive);
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "backend_base_url = [").unwrap();

        assert!(ConfigService::new(path).load_config().is_err());
    }

    #[test]
    fn test_env_override() {
        let config = apply_env_overrides(RootConfig::default(), Some("http://gw:9000".into()));
        assert_eq!(config.backend_base_url, "http://gw:9000");

        let config = apply_env_overrides(RootConfig::default(), Some("  ".into()));
        assert_eq!(config.backend_base_url, "http://localhost:5000");
    }
}
