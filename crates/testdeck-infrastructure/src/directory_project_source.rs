//! Project source that scans a directory on disk.

use async_trait::async_trait;
use std::fs;
use std::path::{Path, PathBuf};
use testdeck_core::artifact::{ArtifactNode, ArtifactTree, NodeKind, ProjectSource};
use testdeck_core::{Result, TestdeckError};

/// Directory names never included in the tree.
const SKIPPED_DIRS: &[&str] = &["target", "node_modules"];

/// Id of the root folder; every other id is a `/`-separated relative path.
pub const ROOT_ID: &str = ".";

/// Builds the artifact tree from a directory.
///
/// Hidden entries, build output and symlinks are left out. Folders come
/// before files, each group sorted by name. Only the root starts expanded.
#[derive(Debug, Clone)]
pub struct DirectoryProjectSource {
    root: PathBuf,
}

impl DirectoryProjectSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ProjectSource for DirectoryProjectSource {
    fn describe(&self) -> String {
        format!("directory {}", self.root.display())
    }

    async fn load(&self) -> Result<ArtifactTree> {
        let root = self.root.clone();
        let node = tokio::task::spawn_blocking(move || scan_root(&root))
            .await
            .map_err(|e| TestdeckError::internal(format!("directory scan panicked: {}", e)))??;

        let tree = ArtifactTree::from_roots(vec![node])?;
        tracing::info!(
            root = %self.root.display(),
            nodes = tree.len(),
            "Scanned project directory"
        );
        Ok(tree)
    }
}

fn scan_root(root: &Path) -> Result<ArtifactNode> {
    if !root.is_dir() {
        return Err(TestdeckError::config(format!(
            "{} is not a directory",
            root.display()
        )));
    }
    let name = root
        .canonicalize()
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_else(|| root.display().to_string());

    let children = scan_dir(root, "")?;
    Ok(ArtifactNode {
        id: ROOT_ID.into(),
        name,
        kind: NodeKind::Folder {
            children,
            expanded: true,
        },
    })
}

fn scan_dir(dir: &Path, prefix: &str) -> Result<Vec<ArtifactNode>> {
    let mut folders = Vec::new();
    let mut files = Vec::new();

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }

        let id = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{}/{}", prefix, name)
        };

        // `DirEntry::file_type` does not follow symlinks.
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            if SKIPPED_DIRS.contains(&name.as_str()) {
                continue;
            }
            let children = scan_dir(&entry.path(), &id)?;
            folders.push(ArtifactNode::folder(id, name, children));
        } else if file_type.is_file() {
            files.push(ArtifactNode::file(id, name));
        }
    }

    folders.sort_by(|a, b| a.name.cmp(&b.name));
    files.sort_by(|a, b| a.name.cmp(&b.name));
    folders.extend(files);
    Ok(folders)
}
