//! Filesystem adapters for testdeck: configuration storage and project
//! sources.

pub mod config_service;
pub mod directory_project_source;
pub mod dto;
pub mod paths;
pub mod project;
pub mod storage;
pub mod toml_project_source;

pub use crate::config_service::ConfigService;
pub use crate::directory_project_source::DirectoryProjectSource;
pub use crate::paths::TestdeckPaths;
pub use crate::project::open_project;
pub use crate::toml_project_source::TomlProjectSource;
