//! Arena-backed artifact tree with single-node selection.

use super::model::{ArtifactNode, ExpansionResult, NodeId, NodeKind, SelectionResult, TreeRow};
use crate::error::{Result, TestdeckError};
use std::collections::HashMap;

const ENTITY: &str = "artifact";

#[derive(Debug, Clone)]
enum Slot {
    Folder { children: Vec<NodeId>, expanded: bool },
    File,
}

#[derive(Debug, Clone)]
struct Entry {
    name: String,
    parent: Option<NodeId>,
    slot: Slot,
}

/// A project snapshot flattened into an arena keyed by node id.
///
/// Structure is fixed once built; the only mutable state is the folder
/// `expanded` flags and the current selection, which always names either
/// nothing or a node present in this tree.
#[derive(Debug, Clone, Default)]
pub struct ArtifactTree {
    nodes: HashMap<NodeId, Entry>,
    roots: Vec<NodeId>,
    selected: Option<NodeId>,
}

impl ArtifactTree {
    /// Creates an empty tree.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a tree from nested root nodes.
    ///
    /// # Errors
    ///
    /// Returns a `Config` error if two nodes share an id.
    pub fn from_roots(roots: Vec<ArtifactNode>) -> Result<Self> {
        let mut tree = Self::empty();
        for root in roots {
            let id = tree.insert(root, None)?;
            tree.roots.push(id);
        }
        Ok(tree)
    }

    /// The built-in demo project shown when no project source is configured.
    pub fn sample() -> Self {
        let roots = vec![
            ArtifactNode::folder(
                "1",
                "Project Root",
                vec![
                    ArtifactNode::folder(
                        "2",
                        "src",
                        vec![
                            ArtifactNode::file("3", "login.test.js"),
                            ArtifactNode::file("4", "api.test.js"),
                        ],
                    ),
                    ArtifactNode::folder(
                        "5",
                        "tests",
                        vec![
                            ArtifactNode::file("6", "integration.test.js"),
                            ArtifactNode::file("7", "e2e.test.js"),
                        ],
                    ),
                ],
            )
            .expanded(),
        ];
        // Ids above are literal and distinct.
        Self::from_roots(roots).unwrap_or_default()
    }

    fn insert(&mut self, node: ArtifactNode, parent: Option<NodeId>) -> Result<NodeId> {
        if self.nodes.contains_key(&node.id) {
            return Err(TestdeckError::config(format!(
                "duplicate artifact id '{}'",
                node.id
            )));
        }

        let id = node.id;
        let slot = match node.kind {
            NodeKind::File => Slot::File,
            NodeKind::Folder { expanded, .. } => Slot::Folder {
                children: Vec::new(),
                expanded,
            },
        };
        self.nodes.insert(
            id.clone(),
            Entry {
                name: node.name,
                parent,
                slot,
            },
        );

        if let NodeKind::Folder { children, .. } = node.kind {
            let mut child_ids = Vec::with_capacity(children.len());
            for child in children {
                child_ids.push(self.insert(child, Some(id.clone()))?);
            }
            if let Some(Entry {
                slot: Slot::Folder { children, .. },
                ..
            }) = self.nodes.get_mut(&id)
            {
                *children = child_ids;
            }
        }

        Ok(id)
    }

    /// Sets the selection to `id`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if `id` is not in the tree; the selection is left
    /// untouched.
    pub fn select(&mut self, id: &NodeId) -> Result<SelectionResult> {
        if !self.nodes.contains_key(id) {
            return Err(TestdeckError::not_found(ENTITY, id.as_str()));
        }
        let previous = self.selected.replace(id.clone());
        Ok(SelectionResult {
            previous,
            current: id.clone(),
        })
    }

    /// Clears the selection, returning what was selected.
    pub fn clear_selection(&mut self) -> Option<NodeId> {
        self.selected.take()
    }

    /// Flips the `expanded` flag of a folder.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for unknown ids and `NotAFolder` for files.
    pub fn toggle_expand(&mut self, id: &NodeId) -> Result<ExpansionResult> {
        let entry = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| TestdeckError::not_found(ENTITY, id.as_str()))?;
        match &mut entry.slot {
            Slot::Folder { expanded, .. } => {
                *expanded = !*expanded;
                Ok(ExpansionResult {
                    id: id.clone(),
                    expanded: *expanded,
                })
            }
            Slot::File => Err(TestdeckError::not_a_folder(id.as_str())),
        }
    }

    pub fn current_selection(&self) -> Option<&NodeId> {
        self.selected.as_ref()
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn name_of(&self, id: &NodeId) -> Option<&str> {
        self.nodes.get(id).map(|e| e.name.as_str())
    }

    /// Returns `Some(expanded)` for folders, `None` for files or unknown ids.
    pub fn is_expanded(&self, id: &NodeId) -> Option<bool> {
        match self.nodes.get(id).map(|e| &e.slot) {
            Some(Slot::Folder { expanded, .. }) => Some(*expanded),
            _ => None,
        }
    }

    pub fn children_of(&self, id: &NodeId) -> &[NodeId] {
        match self.nodes.get(id).map(|e| &e.slot) {
            Some(Slot::Folder { children, .. }) => children,
            _ => &[],
        }
    }

    /// Slash-joined names from the root down to `id`.
    pub fn path_of(&self, id: &NodeId) -> Option<String> {
        let mut names = Vec::new();
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let entry = self.nodes.get(current)?;
            names.push(entry.name.as_str());
            cursor = entry.parent.as_ref();
        }
        names.reverse();
        Some(names.join("/"))
    }

    /// Depth-first rows of everything currently visible: roots, and the
    /// children of expanded folders.
    pub fn visible_rows(&self) -> Vec<TreeRow> {
        let mut rows = Vec::new();
        let mut stack: Vec<(&NodeId, usize)> = self.roots.iter().rev().map(|id| (id, 0)).collect();

        while let Some((id, depth)) = stack.pop() {
            let Some(entry) = self.nodes.get(id) else {
                continue;
            };
            let (is_folder, expanded) = match &entry.slot {
                Slot::Folder { expanded, .. } => (true, *expanded),
                Slot::File => (false, false),
            };
            rows.push(TreeRow {
                id: id.clone(),
                name: entry.name.clone(),
                depth,
                is_folder,
                expanded,
                selected: self.selected.as_ref() == Some(id),
            });
            if let Slot::Folder {
                children,
                expanded: true,
            } = &entry.slot
            {
                stack.extend(children.iter().rev().map(|child| (child, depth + 1)));
            }
        }

        rows
    }

    /// Rebuilds the nested snapshot form, including current `expanded` flags.
    pub fn to_nodes(&self) -> Vec<ArtifactNode> {
        self.roots.iter().filter_map(|id| self.build_node(id)).collect()
    }

    fn build_node(&self, id: &NodeId) -> Option<ArtifactNode> {
        let entry = self.nodes.get(id)?;
        let kind = match &entry.slot {
            Slot::File => NodeKind::File,
            Slot::Folder { children, expanded } => NodeKind::Folder {
                children: children.iter().filter_map(|c| self.build_node(c)).collect(),
                expanded: *expanded,
            },
        };
        Some(ArtifactNode {
            id: id.clone(),
            name: entry.name.clone(),
            kind,
        })
    }

    /// Replaces the whole structure with `next`, keeping the current
    /// selection only if its id still exists in `next`.
    ///
    /// Returns the selection that was dropped, if any.
    pub fn replace(&mut self, next: ArtifactTree) -> Option<NodeId> {
        let selected = self.selected.take();
        self.nodes = next.nodes;
        self.roots = next.roots;
        match selected {
            Some(id) if self.nodes.contains_key(&id) => {
                self.selected = Some(id);
                None
            }
            dropped => {
                self.selected = next.selected.filter(|id| self.nodes.contains_key(id));
                dropped
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> NodeId {
        NodeId::from(s)
    }

    #[test]
    fn test_sample_tree_shape() {
        let tree = ArtifactTree::sample();
        assert_eq!(tree.len(), 7);
        assert_eq!(tree.roots(), &[id("1")]);
        assert_eq!(tree.children_of(&id("2")), &[id("3"), id("4")]);
        assert_eq!(tree.is_expanded(&id("1")), Some(true));
        assert_eq!(tree.is_expanded(&id("2")), Some(false));
        assert_eq!(tree.is_expanded(&id("3")), None);
    }

    #[test]
    fn test_select_then_current_selection() {
        let mut tree = ArtifactTree::sample();
        let first = tree.select(&id("3")).unwrap();
        assert_eq!(first.previous, None);
        assert_eq!(tree.current_selection(), Some(&id("3")));

        let second = tree.select(&id("5")).unwrap();
        assert_eq!(second.previous, Some(id("3")));
        assert_eq!(second.current, id("5"));
    }

    #[test]
    fn test_select_unknown_leaves_selection() {
        let mut tree = ArtifactTree::sample();
        tree.select(&id("4")).unwrap();

        let err = tree.select(&id("missing")).unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(tree.current_selection(), Some(&id("4")));
    }

    #[test]
    fn test_toggle_expand_twice_restores() {
        let mut tree = ArtifactTree::sample();
        let before = tree.is_expanded(&id("5")).unwrap();

        let first = tree.toggle_expand(&id("5")).unwrap();
        assert_eq!(first.expanded, !before);
        let second = tree.toggle_expand(&id("5")).unwrap();
        assert_eq!(second.expanded, before);
        assert_eq!(tree.is_expanded(&id("5")), Some(before));
    }

    #[test]
    fn test_toggle_expand_errors() {
        let mut tree = ArtifactTree::sample();
        tree.select(&id("2")).unwrap();

        assert!(matches!(
            tree.toggle_expand(&id("3")),
            Err(TestdeckError::NotAFolder { .. })
        ));
        assert!(tree.toggle_expand(&id("nope")).unwrap_err().is_not_found());
        // Expansion never touches selection.
        tree.toggle_expand(&id("2")).unwrap();
        assert_eq!(tree.current_selection(), Some(&id("2")));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let roots = vec![ArtifactNode::folder(
            "a",
            "root",
            vec![ArtifactNode::file("b", "x"), ArtifactNode::file("b", "y")],
        )];
        let err = ArtifactTree::from_roots(roots).unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_visible_rows_follow_expansion() {
        let mut tree = ArtifactTree::sample();
        let names: Vec<_> = tree.visible_rows().into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["Project Root", "src", "tests"]);

        tree.toggle_expand(&id("2")).unwrap();
        tree.select(&id("4")).unwrap();
        let rows = tree.visible_rows();
        let names: Vec<_> = rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Project Root", "src", "login.test.js", "api.test.js", "tests"]
        );
        assert_eq!(rows[2].depth, 2);
        assert!(rows[3].selected);
    }

    #[test]
    fn test_path_of() {
        let tree = ArtifactTree::sample();
        assert_eq!(
            tree.path_of(&id("6")).as_deref(),
            Some("Project Root/tests/integration.test.js")
        );
        assert_eq!(tree.path_of(&id("zzz")), None);
    }

    #[test]
    fn test_replace_keeps_surviving_selection() {
        let mut tree = ArtifactTree::sample();
        tree.select(&id("3")).unwrap();

        let next = ArtifactTree::from_roots(vec![ArtifactNode::folder(
            "1",
            "Reloaded",
            vec![ArtifactNode::file("3", "login.test.js")],
        )])
        .unwrap();
        assert_eq!(tree.replace(next), None);
        assert_eq!(tree.current_selection(), Some(&id("3")));

        let next = ArtifactTree::from_roots(vec![ArtifactNode::file("9", "solo")]).unwrap();
        assert_eq!(tree.replace(next), Some(id("3")));
        assert_eq!(tree.current_selection(), None);
    }

    #[test]
    fn test_to_nodes_round_trips_structure() {
        let mut tree = ArtifactTree::sample();
        tree.toggle_expand(&id("5")).unwrap();
        let rebuilt = ArtifactTree::from_roots(tree.to_nodes()).unwrap();
        assert_eq!(rebuilt.len(), tree.len());
        assert_eq!(rebuilt.is_expanded(&id("5")), Some(true));
    }
}
