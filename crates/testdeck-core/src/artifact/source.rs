//! Project source trait.

use super::tree::ArtifactTree;
use crate::error::Result;
use async_trait::async_trait;

/// Supplies the initial artifact tree for a session.
///
/// Loading is a one-shot import; the returned tree is not kept in sync with
/// the underlying project.
#[async_trait]
pub trait ProjectSource: Send + Sync {
    /// Short human-readable description (a path, "built-in sample", ...).
    fn describe(&self) -> String;

    /// Loads a fresh snapshot of the project.
    async fn load(&self) -> Result<ArtifactTree>;
}

/// Serves the built-in demo project.
#[derive(Debug, Clone, Copy, Default)]
pub struct SampleProjectSource;

#[async_trait]
impl ProjectSource for SampleProjectSource {
    fn describe(&self) -> String {
        "built-in sample project".to_string()
    }

    async fn load(&self) -> Result<ArtifactTree> {
        Ok(ArtifactTree::sample())
    }
}
