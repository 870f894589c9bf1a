//! On-disk shapes, kept separate from the domain types.

pub mod project;

pub use project::{NodeDto, NodeKindDto, ProjectManifestDto};
