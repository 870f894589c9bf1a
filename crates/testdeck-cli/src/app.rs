use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use testdeck_application::{Session, SessionRegistry};
use testdeck_core::config::RootConfig;
use testdeck_infrastructure::open_project;
use testdeck_interaction::build_engine;

/// Wiring shared by the commands: configuration, engine and sessions.
pub struct App {
    pub config: RootConfig,
    pub registry: SessionRegistry,
}

impl App {
    pub fn new(config: RootConfig) -> Result<Self> {
        let engine = build_engine(&config.engine).context("Failed to set up the generation engine")?;
        tracing::debug!(engine = engine.name(), "Engine ready");
        let registry = SessionRegistry::new(engine, config.session.clone());
        Ok(Self { config, registry })
    }

    /// Opens a session over `project` (the built-in sample if `None`).
    pub async fn open_session(&self, project: Option<&Path>) -> Result<Arc<Session>> {
        let source = open_project(project);
        let description = source.describe();
        self.registry
            .open(source)
            .await
            .with_context(|| format!("Failed to load {}", description))
    }
}
