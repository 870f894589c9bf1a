//! Generation engine implementations and the factory that picks one from
//! configuration.

pub mod http_engine;
pub mod simulated_engine;

pub use http_engine::HttpEngine;
pub use simulated_engine::SimulatedEngine;

use std::sync::Arc;
use std::time::Duration;
use testdeck_core::config::{EngineKind, EngineSettings};
use testdeck_core::engine::GenerationEngine;
use testdeck_core::{Result, TestdeckError};

/// Builds the engine described by `settings`.
///
/// The HTTP engine's bearer token is read from the environment variable
/// named by `api_key_env`; an unset variable means no `Authorization` header.
pub fn build_engine(settings: &EngineSettings) -> Result<Arc<dyn GenerationEngine>> {
    match settings.kind {
        EngineKind::Simulated => Ok(Arc::new(SimulatedEngine::new(
            Duration::from_millis(settings.simulated_delay_ms),
            settings.simulated_reply.clone(),
        ))),
        EngineKind::Http => {
            let endpoint = settings
                .endpoint
                .as_deref()
                .filter(|e| !e.trim().is_empty())
                .ok_or_else(|| TestdeckError::config("engine.endpoint is not set"))?;
            let token = std::env::var(&settings.api_key_env).ok();
            if token.is_none() {
                tracing::debug!(var = %settings.api_key_env, "No engine token in environment");
            }
            let engine = HttpEngine::new(endpoint)?.with_bearer_token(token);
            tracing::info!(endpoint = engine.endpoint(), "Using HTTP engine");
            Ok(Arc::new(engine))
        }
    }
}
