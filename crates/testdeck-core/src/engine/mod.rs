//! Generation engine boundary.
//!
//! The engine turns a natural-language request plus the selection captured
//! at submit time into generated output. Implementations live in
//! `testdeck-interaction`; this module only fixes the contract.

use crate::artifact::NodeId;
use crate::error::TestdeckError;
use crate::session::EntryId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// A request dispatched to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub request_id: EntryId,
    pub text: String,
    pub selection_context: Option<NodeId>,
    /// Human-readable path of the selected node, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection_path: Option<String>,
}

/// Successful engine output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationResponse {
    pub content: String,
}

impl GenerationResponse {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}

/// Category of an engine failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineErrorKind {
    /// No answer within the allowed time.
    Timeout,
    /// The engine acknowledged a cancellation.
    Cancelled,
    /// The engine could not be reached.
    Unavailable,
    /// The engine refused the request.
    Rejected,
    /// The engine answered with something unreadable.
    Protocol,
    Internal,
}

impl fmt::Display for EngineErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Timeout => "timeout",
            Self::Cancelled => "cancelled",
            Self::Unavailable => "unavailable",
            Self::Rejected => "rejected",
            Self::Protocol => "protocol",
            Self::Internal => "internal",
        };
        f.write_str(name)
    }
}

/// Failure reported by an engine: `{ errorKind, message }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct EngineError {
    pub kind: EngineErrorKind,
    pub message: String,
}

impl EngineError {
    pub fn new(kind: EngineErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn timeout(after: Duration) -> Self {
        Self::new(
            EngineErrorKind::Timeout,
            format!("no response within {} ms", after.as_millis()),
        )
    }

    pub fn cancelled() -> Self {
        Self::new(EngineErrorKind::Cancelled, "request cancelled")
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(EngineErrorKind::Unavailable, message)
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::new(EngineErrorKind::Rejected, message)
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::new(EngineErrorKind::Protocol, message)
    }

    pub fn is_cancelled(&self) -> bool {
        self.kind == EngineErrorKind::Cancelled
    }
}

impl From<EngineError> for TestdeckError {
    fn from(err: EngineError) -> Self {
        TestdeckError::EngineFailure(err.to_string())
    }
}

/// External system that generates (and runs) tests from a request.
///
/// Each call must resolve exactly once. Implementations should watch
/// `cancel` and return early with [`EngineError::cancelled`] when it fires;
/// callers treat cancellation as best effort and ignore late results.
#[async_trait]
pub trait GenerationEngine: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    async fn generate(
        &self,
        request: GenerationRequest,
        cancel: CancellationToken,
    ) -> Result<GenerationResponse, EngineError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EngineError::rejected("quota exceeded");
        assert_eq!(err.to_string(), "rejected: quota exceeded");

        let err = EngineError::timeout(Duration::from_secs(2));
        assert_eq!(err.to_string(), "timeout: no response within 2000 ms");
    }

    #[test]
    fn test_into_domain_error() {
        let err: TestdeckError = EngineError::unavailable("connection refused").into();
        assert_eq!(
            err,
            TestdeckError::EngineFailure("unavailable: connection refused".to_string())
        );
    }

    #[test]
    fn test_request_wire_shape() {
        let request = GenerationRequest {
            request_id: EntryId::new(7),
            text: "add login test".to_string(),
            selection_context: Some(NodeId::from("3")),
            selection_path: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["selection_context"], "3");
        assert!(json.get("selection_path").is_none());
    }
}
