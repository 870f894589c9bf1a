//! Error types for testdeck.

use serde::Serialize;
use thiserror::Error;

/// A shared error type for the whole testdeck workspace.
///
/// Domain variants (`EmptyRequest`, `Busy`, `NotFound`, ...) are returned
/// synchronously by tree and orchestrator operations. Engine failures that
/// happen while a request is in flight never surface here; they are recorded
/// as log entries instead.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
pub enum TestdeckError {
    /// The submitted request was blank after trimming.
    #[error("Request is empty")]
    EmptyRequest,

    /// A request is already in flight for this session.
    #[error("Session is busy: a request is already awaiting a response")]
    Busy,

    /// Entity not found error with type information
    #[error("Entity not found: {entity_type} '{id}'")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// An expansion was requested on a file node.
    #[error("Node '{id}' is not a folder")]
    NotAFolder { id: String },

    /// The engine did not answer within the configured duration.
    #[error("Timed out after {after_ms} ms")]
    Timeout { after_ms: u64 },

    /// The engine reported a failure.
    #[error("Engine failure: {0}")]
    EngineFailure(String),

    /// Bounded history is full and nothing can be evicted.
    #[error("Session log capacity exceeded ({capacity} entries)")]
    CapacityExceeded { capacity: usize },

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization {
        format: String, // "TOML", "JSON", etc.
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl TestdeckError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a NotFound error
    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    /// Creates a NotAFolder error
    pub fn not_a_folder(id: impl Into<String>) -> Self {
        Self::NotAFolder { id: id.into() }
    }

    /// Creates an IO error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Check if this is a NotFound error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is a Busy error
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Busy)
    }

    /// Check if this is an EmptyRequest error
    pub fn is_empty_request(&self) -> bool {
        matches!(self, Self::EmptyRequest)
    }

    /// Check if this is a config error
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Returns true when a later `submit` can succeed without outside help.
    ///
    /// Every domain error is recoverable; internal errors are not.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Internal(_))
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for TestdeckError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for TestdeckError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for TestdeckError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for TestdeckError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// Conversion from anyhow::Error (used at the binary boundary)
impl From<anyhow::Error> for TestdeckError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// A type alias for `Result<T, TestdeckError>`.
pub type Result<T> = std::result::Result<T, TestdeckError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message() {
        let err = TestdeckError::not_found("artifact", "42");
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Entity not found: artifact '42'");
    }

    #[test]
    fn test_io_conversion_keeps_kind() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: TestdeckError = io.into();
        match err {
            TestdeckError::Io { message } => assert!(message.contains("NotFound")),
            other => panic!("Expected Io, got {:?}", other),
        }
    }

    #[test]
    fn test_recoverable() {
        assert!(TestdeckError::Busy.is_recoverable());
        assert!(TestdeckError::EmptyRequest.is_recoverable());
        assert!(!TestdeckError::internal("broken invariant").is_recoverable());
    }
}
