//! Artifact tree domain module.
//!
//! - `model`: nested node types (`ArtifactNode`, `NodeKind`, `NodeId`)
//! - `tree`: arena storage with selection and expansion (`ArtifactTree`)
//! - `source`: the `ProjectSource` import boundary

mod model;
mod source;
mod tree;

pub use model::{ArtifactNode, ExpansionResult, NodeId, NodeKind, SelectionResult, TreeRow};
pub use source::{ProjectSource, SampleProjectSource};
pub use tree::ArtifactTree;
