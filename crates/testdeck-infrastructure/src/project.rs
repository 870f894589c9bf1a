use crate::directory_project_source::DirectoryProjectSource;
use crate::toml_project_source::TomlProjectSource;
use std::path::Path;
use std::sync::Arc;
use testdeck_core::artifact::{ProjectSource, SampleProjectSource};

/// Picks the project source for `path`.
///
/// `None` serves the built-in sample, a `.toml` file is read as a manifest
/// and anything else is scanned as a directory.
pub fn open_project(path: Option<&Path>) -> Arc<dyn ProjectSource> {
    match path {
        None => Arc::new(SampleProjectSource),
        Some(p) if p.extension().is_some_and(|ext| ext == "toml") => {
            Arc::new(TomlProjectSource::new(p))
        }
        Some(p) => Arc::new(DirectoryProjectSource::new(p)),
    }
}
