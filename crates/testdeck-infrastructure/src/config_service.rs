//! Configuration service.
//!
//! Loads the root configuration from `~/.config/testdeck/config.toml`
//! and caches it for the life of the process.

use crate::paths::TestdeckPaths;
use crate::storage::AtomicTomlFile;
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};
use testdeck_core::Result;
use testdeck_core::config::RootConfig;

/// Loads, validates and caches [`RootConfig`].
#[derive(Debug, Clone)]
pub struct ConfigService {
    paths: TestdeckPaths,
    config: Arc<RwLock<Option<RootConfig>>>,
}

impl ConfigService {
    /// Uses the platform config directory.
    pub fn new() -> Self {
        Self::with_paths(TestdeckPaths::new())
    }

    pub fn with_paths(paths: TestdeckPaths) -> Self {
        Self {
            paths,
            config: Arc::new(RwLock::new(None)),
        }
    }

    /// Path of the config file, whether or not it exists.
    pub fn path(&self) -> Result<PathBuf> {
        Ok(self.paths.config_file()?)
    }

    /// Returns the configuration, reading the file on first access.
    ///
    /// A missing file yields the defaults; a malformed or invalid one is an
    /// error rather than a silent fallback.
    pub fn load(&self) -> Result<RootConfig> {
        {
            let cached = self.config.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(config) = cached.as_ref() {
                return Ok(config.clone());
            }
        }

        let path = self.path()?;
        let config = match AtomicTomlFile::<RootConfig>::new(&path).load()? {
            Some(config) => {
                tracing::debug!(path = %path.display(), "Loaded configuration");
                config
            }
            None => {
                tracing::debug!(path = %path.display(), "No configuration file, using defaults");
                RootConfig::default()
            }
        };
        config.validate()?;

        *self.config.write().unwrap_or_else(PoisonError::into_inner) = Some(config.clone());
        Ok(config)
    }

    /// Writes a default `config.toml` unless one already exists.
    ///
    /// Returns the file path and whether it was created.
    pub fn ensure_default(&self) -> Result<(PathBuf, bool)> {
        let path = self.path()?;
        let created = AtomicTomlFile::new(&path).create_if_missing(&RootConfig::default())?;
        if created {
            tracing::info!(path = %path.display(), "Created default configuration");
        }
        Ok((path, created))
    }

    /// Forces the next [`load`](Self::load) to re-read the file.
    pub fn invalidate_cache(&self) {
        *self.config.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl Default for ConfigService {
    fn default() -> Self {
        Self::new()
    }
}
