//! Unified path management for PolyAgent files.
//!
//! ```text
//! ~/.config/polyagent/          # Config directory
//! └── config.toml               # Application configuration
//!
//! ~/.local/share/polyagent/     # Data directory
//! └── <namespace>/              # One directory per storage namespace
//!     ├── poly-ai-conversations.dat
//!     └── poly-ai-current-conversation.dat
//! ```

use std::path::PathBuf;

const APP_DIR: &str = "polyagent";

/// Errors that can occur during path resolution.
#[derive(Debug)]
pub enum PathError {
    /// Home directory could not be determined.
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

impl From<PathError> for polyagent_core::PolyError {
    fn from(e: PathError) -> Self {
        polyagent_core::PolyError::config(e.to_string())
    }
}

/// Resolves where configuration and conversation data live.
///
/// With a base directory override, everything is placed under it instead of
/// the platform directories.
#[derive(Debug, Clone, Default)]
pub struct PolyAgentPaths {
    base: Option<PathBuf>,
}

impl PolyAgentPaths {
    pub fn new(base: Option<PathBuf>) -> Self {
        Self { base }
    }

    pub fn config_dir(&self) -> Result<PathBuf, PathError> {
        match &self.base {
            Some(base) => Ok(base.join("config")),
            None => dirs::config_dir()
                .map(|dir| dir.join(APP_DIR))
                .ok_or(PathError::HomeDirNotFound),
        }
    }

    pub fn data_dir(&self) -> Result<PathBuf, PathError> {
        match &self.base {
            Some(base) => Ok(base.join("data")),
            None => dirs::data_dir()
                .map(|dir| dir.join(APP_DIR))
                .ok_or(PathError::HomeDirNotFound),
        }
    }

    /// Path to `config.toml`.
    pub fn config_file(&self) -> Result<PathBuf, PathError> {
        Ok(self.config_dir()?.join("config.toml"))
    }

    /// Directory holding the key/value files of one storage namespace.
    pub fn store_dir(&self, namespace: &str) -> Result<PathBuf, PathError> {
        Ok(self.data_dir()?.join(namespace))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_override() {
        let paths = PolyAgentPaths::new(Some(PathBuf::from("/tmp/pa")));
        assert_eq!(
            paths.config_file().unwrap(),
            PathBuf::from("/tmp/pa/config/config.toml")
        );
        assert_eq!(
            paths.store_dir("poly-ai").unwrap(),
            PathBuf::from("/tmp/pa/data/poly-ai")
        );
    }
}
