//! Project manifest DTOs.
//!
//! ```toml
//! [[nodes]]
//! id = "1"
//! name = "Project Root"
//! kind = "folder"
//! expanded = true
//!
//!   [[nodes.children]]
//!   id = "3"
//!   name = "login.test.js"
//! ```

use serde::{Deserialize, Serialize};
use testdeck_core::artifact::{ArtifactNode, NodeKind};
use testdeck_core::{Result, TestdeckError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectManifestDto {
    #[serde(default)]
    pub nodes: Vec<NodeDto>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKindDto {
    Folder,
    #[default]
    File,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDto {
    pub id: String,
    pub name: String,
    /// Defaults to `folder` when children are given, `file` otherwise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<NodeKindDto>,
    #[serde(default)]
    pub expanded: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeDto>,
}

impl NodeDto {
    /// Converts into a domain node.
    ///
    /// # Errors
    ///
    /// Returns a `Config` error for a file that declares children.
    pub fn into_domain(self) -> Result<ArtifactNode> {
        let kind = self.kind.unwrap_or(if self.children.is_empty() {
            NodeKindDto::File
        } else {
            NodeKindDto::Folder
        });

        match kind {
            NodeKindDto::File if !self.children.is_empty() => Err(TestdeckError::config(format!(
                "file node '{}' cannot have children",
                self.id
            ))),
            NodeKindDto::File => Ok(ArtifactNode::file(self.id, self.name)),
            NodeKindDto::Folder => {
                let children = self
                    .children
                    .into_iter()
                    .map(NodeDto::into_domain)
                    .collect::<Result<Vec<_>>>()?;
                Ok(ArtifactNode {
                    id: self.id.into(),
                    name: self.name,
                    kind: NodeKind::Folder {
                        children,
                        expanded: self.expanded,
                    },
                })
            }
        }
    }
}

impl ProjectManifestDto {
    pub fn into_domain(self) -> Result<Vec<ArtifactNode>> {
        self.nodes.into_iter().map(NodeDto::into_domain).collect()
    }
}
