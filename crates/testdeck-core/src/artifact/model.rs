//! Artifact node types.
//!
//! `ArtifactNode` is the nested, owned form of a project snapshot as it
//! arrives from a project source or leaves for a presentation layer.
//! `ArtifactTree` stores the same data flattened into an arena.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier of an artifact node, stable for the node's lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for NodeId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Whether a node is a folder (with ordered children) or a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeKind {
    Folder {
        /// Display order is significant.
        #[serde(default)]
        children: Vec<ArtifactNode>,
        /// View state only; never part of identity.
        #[serde(default)]
        expanded: bool,
    },
    File,
}

/// A node of a project snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactNode {
    pub id: NodeId,
    pub name: String,
    #[serde(flatten)]
    pub kind: NodeKind,
}

impl ArtifactNode {
    /// Creates a file node.
    pub fn file(id: impl Into<NodeId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: NodeKind::File,
        }
    }

    /// Creates a collapsed folder node.
    pub fn folder(
        id: impl Into<NodeId>,
        name: impl Into<String>,
        children: Vec<ArtifactNode>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: NodeKind::Folder {
                children,
                expanded: false,
            },
        }
    }

    /// Marks a folder as expanded. Files are returned unchanged.
    pub fn expanded(mut self) -> Self {
        if let NodeKind::Folder { expanded, .. } = &mut self.kind {
            *expanded = true;
        }
        self
    }

    pub fn is_folder(&self) -> bool {
        matches!(self.kind, NodeKind::Folder { .. })
    }
}

/// Outcome of a successful `select`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectionResult {
    pub previous: Option<NodeId>,
    pub current: NodeId,
}

/// Outcome of a successful `toggle_expand`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpansionResult {
    pub id: NodeId,
    pub expanded: bool,
}

/// One visible line of the tree, in display order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeRow {
    pub id: NodeId,
    pub name: String,
    pub depth: usize,
    pub is_folder: bool,
    pub expanded: bool,
    pub selected: bool,
}
