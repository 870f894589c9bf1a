//! Project source backed by a TOML manifest.

use crate::dto::ProjectManifestDto;
use async_trait::async_trait;
use std::path::PathBuf;
use testdeck_core::artifact::{ArtifactTree, ProjectSource};
use testdeck_core::{Result, TestdeckError};

/// Reads a tree of `[[nodes]]` tables from a manifest file.
#[derive(Debug, Clone)]
pub struct TomlProjectSource {
    path: PathBuf,
}

impl TomlProjectSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ProjectSource for TomlProjectSource {
    fn describe(&self) -> String {
        format!("manifest {}", self.path.display())
    }

    async fn load(&self) -> Result<ArtifactTree> {
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            TestdeckError::io(format!("failed to read {}: {}", self.path.display(), e))
        })?;
        let manifest: ProjectManifestDto = toml::from_str(&content)?;
        let tree = ArtifactTree::from_roots(manifest.into_domain()?)?;

        tracing::info!(
            path = %self.path.display(),
            nodes = tree.len(),
            "Loaded project manifest"
        );
        Ok(tree)
    }
}
