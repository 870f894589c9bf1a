//! Path management for testdeck configuration files.
//!
//! ```text
//! ~/.config/testdeck/          # Config directory (platform default)
//! └── config.toml              # Application configuration
//! ```

use std::path::PathBuf;
use testdeck_core::TestdeckError;

const APP_DIR: &str = "testdeck";
const CONFIG_FILE: &str = "config.toml";

/// Errors that can occur during path resolution.
#[derive(Debug, thiserror::Error)]
pub enum PathError {
    /// No platform config directory could be determined.
    #[error("Cannot find the user configuration directory")]
    ConfigDirNotFound,
}

impl From<PathError> for TestdeckError {
    fn from(err: PathError) -> Self {
        TestdeckError::config(err.to_string())
    }
}

/// Resolves where testdeck keeps its files.
///
/// An explicit base directory overrides the platform default, which is how
/// tests keep their files inside a temp dir.
#[derive(Debug, Clone, Default)]
pub struct TestdeckPaths {
    base: Option<PathBuf>,
}

impl TestdeckPaths {
    /// Uses the platform config directory (`~/.config/testdeck` on Linux).
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses `base` in place of the platform config directory.
    pub fn with_base(base: impl Into<PathBuf>) -> Self {
        Self {
            base: Some(base.into()),
        }
    }

    /// Returns the testdeck configuration directory.
    pub fn config_dir(&self) -> Result<PathBuf, PathError> {
        if let Some(base) = &self.base {
            return Ok(base.clone());
        }
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or(PathError::ConfigDirNotFound)
    }

    /// Returns the path to `config.toml`.
    pub fn config_file(&self) -> Result<PathBuf, PathError> {
        Ok(self.config_dir()?.join(CONFIG_FILE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_override() {
        let paths = TestdeckPaths::with_base("/tmp/testdeck-test");
        assert_eq!(
            paths.config_file().unwrap(),
            PathBuf::from("/tmp/testdeck-test/config.toml")
        );
    }

    #[test]
    fn test_default_ends_with_app_dir() {
        // Skipped on hosts without a config dir.
        if let Ok(dir) = TestdeckPaths::new().config_dir() {
            assert!(dir.ends_with(APP_DIR));
        }
    }
}
