//! Engine reached over HTTP.
//!
//! Wire contract: the request is POSTed as JSON
//! `{ request_id, text, selection_context, selection_path? }`; the service
//! answers `{ content }` on success or `{ error_kind, message }` on failure.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use testdeck_core::engine::{
    EngineError, EngineErrorKind, GenerationEngine, GenerationRequest, GenerationResponse,
};
use testdeck_core::{Result, TestdeckError};
use tokio_util::sync::CancellationToken;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireResponse {
    Failure {
        error_kind: EngineErrorKind,
        message: String,
    },
    Success {
        content: String,
    },
}

/// Posts requests to a remote generation service.
#[derive(Debug, Clone)]
pub struct HttpEngine {
    client: Client,
    endpoint: String,
    bearer_token: Option<String>,
}

impl HttpEngine {
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| TestdeckError::config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            bearer_token: None,
        })
    }

    pub fn with_bearer_token(mut self, token: Option<String>) -> Self {
        self.bearer_token = token.filter(|t| !t.is_empty());
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn post(
        &self,
        request: &GenerationRequest,
    ) -> std::result::Result<GenerationResponse, EngineError> {
        let mut builder = self.client.post(&self.endpoint).json(request);
        if let Some(token) = &self.bearer_token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }

        let response = builder
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    EngineError::timeout(CONNECT_TIMEOUT)
                } else {
                    EngineError::unavailable(format!("request failed: {}", e))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| EngineError::unavailable(format!("failed to read response: {}", e)))?;

        match (status.is_success(), serde_json::from_str::<WireResponse>(&body)) {
            (_, Ok(WireResponse::Failure { error_kind, message })) => {
                Err(EngineError::new(error_kind, message))
            }
            (true, Ok(WireResponse::Success { content })) => Ok(GenerationResponse::new(content)),
            (true, Err(e)) => Err(EngineError::protocol(format!(
                "unexpected response body: {}",
                e
            ))),
            (false, _) => Err(EngineError::rejected(format!(
                "HTTP {}: {}",
                status,
                body.trim()
            ))),
        }
    }
}

#[async_trait]
impl GenerationEngine for HttpEngine {
    fn name(&self) -> &str {
        "http"
    }

    async fn generate(
        &self,
        request: GenerationRequest,
        cancel: CancellationToken,
    ) -> std::result::Result<GenerationResponse, EngineError> {
        tracing::debug!(
            request_id = %request.request_id,
            endpoint = %self.endpoint(),
            "Posting generation request"
        );

        tokio::select! {
            _ = cancel.cancelled() => Err(EngineError::cancelled()),
            result = self.post(&request) => result,
        }
    }
}
