//! In-process engine that answers with a canned reply after a delay.

use async_trait::async_trait;
use std::time::Duration;
use testdeck_core::engine::{EngineError, GenerationEngine, GenerationRequest, GenerationResponse};
use tokio_util::sync::CancellationToken;

/// Stand-in for a real generation backend, used by default and in demos.
#[derive(Debug, Clone)]
pub struct SimulatedEngine {
    delay: Duration,
    reply: String,
}

impl SimulatedEngine {
    pub fn new(delay: Duration, reply: impl Into<String>) -> Self {
        Self {
            delay,
            reply: reply.into(),
        }
    }

    fn render(&self, request: &GenerationRequest) -> String {
        match (&request.selection_path, &request.selection_context) {
            (Some(path), _) => format!("{} (context: {})", self.reply, path),
            (None, Some(id)) => format!("{} (context: {})", self.reply, id),
            (None, None) => self.reply.clone(),
        }
    }
}

#[async_trait]
impl GenerationEngine for SimulatedEngine {
    fn name(&self) -> &str {
        "simulated"
    }

    async fn generate(
        &self,
        request: GenerationRequest,
        cancel: CancellationToken,
    ) -> Result<GenerationResponse, EngineError> {
        tracing::debug!(
            request_id = %request.request_id,
            delay_ms = self.delay.as_millis() as u64,
            "Simulating generation"
        );

        tokio::select! {
            _ = cancel.cancelled() => Err(EngineError::cancelled()),
            _ = tokio::time::sleep(self.delay) => Ok(GenerationResponse::new(self.render(&request))),
        }
    }
}
