//! Request lifecycle state for a session.

use super::entry::EntryId;
use crate::artifact::NodeId;
use crate::error::{Result, TestdeckError};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// Whether the session can accept a new request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Idle,
    AwaitingResponse,
}

/// Descriptor of the single request in flight.
///
/// The selection fields are a snapshot taken at submit time; later changes
/// to the tree selection do not reach an in-flight request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingRequest {
    /// Id of the User entry that opened this request cycle.
    pub request_id: EntryId,
    pub text: String,
    pub selection: Option<NodeId>,
    /// Slash-joined names from the root to the selected node.
    pub selection_path: Option<String>,
    pub submitted_at: String,
}

#[derive(Debug)]
struct InFlight {
    request: PendingRequest,
    cancel: CancellationToken,
}

/// At most one in-flight request plus its cancellation handle.
///
/// The status is derived from the pending slot, so `AwaitingResponse` holds
/// exactly when a request is pending.
#[derive(Debug, Default)]
pub struct SessionState {
    in_flight: Option<InFlight>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> SessionStatus {
        if self.in_flight.is_some() {
            SessionStatus::AwaitingResponse
        } else {
            SessionStatus::Idle
        }
    }

    pub fn pending(&self) -> Option<&PendingRequest> {
        self.in_flight.as_ref().map(|f| &f.request)
    }

    /// Fails with `Busy` unless the session is idle.
    pub fn ensure_idle(&self) -> Result<()> {
        match self.in_flight {
            Some(_) => Err(TestdeckError::Busy),
            None => Ok(()),
        }
    }

    /// Records `request` as in flight and returns the token that cancels it.
    ///
    /// # Errors
    ///
    /// Returns `Busy` if a request is already pending.
    pub fn begin(&mut self, request: PendingRequest) -> Result<CancellationToken> {
        self.ensure_idle()?;
        let cancel = CancellationToken::new();
        self.in_flight = Some(InFlight {
            request,
            cancel: cancel.clone(),
        });
        Ok(cancel)
    }

    /// Clears the pending request if, and only if, it is `request_id`.
    ///
    /// A completion for any other id is stale (the request was cancelled or
    /// reset) and yields `None`. The request's token is fired either way once
    /// it leaves the slot, releasing anything still waiting on it.
    pub fn finish(&mut self, request_id: EntryId) -> Option<PendingRequest> {
        match &self.in_flight {
            Some(f) if f.request.request_id == request_id => self.in_flight.take().map(|f| {
                f.cancel.cancel();
                f.request
            }),
            _ => None,
        }
    }

    /// Clears whatever is pending, firing its cancellation token.
    pub fn cancel(&mut self) -> Option<PendingRequest> {
        self.in_flight.take().map(|f| {
            f.cancel.cancel();
            f.request
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending(id: u64) -> PendingRequest {
        PendingRequest {
            request_id: EntryId::new(id),
            text: "add login test".to_string(),
            selection: Some(NodeId::from("3")),
            selection_path: None,
            submitted_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    #[test]
    fn test_begin_and_busy() {
        let mut state = SessionState::new();
        assert_eq!(state.status(), SessionStatus::Idle);

        state.begin(pending(1)).unwrap();
        assert_eq!(state.status(), SessionStatus::AwaitingResponse);
        assert!(state.begin(pending(2)).unwrap_err().is_busy());
        assert_eq!(state.pending().map(|p| p.request_id), Some(EntryId::new(1)));
    }

    #[test]
    fn test_finish_ignores_stale_ids() {
        let mut state = SessionState::new();
        let token = state.begin(pending(1)).unwrap();

        assert!(state.finish(EntryId::new(99)).is_none());
        assert_eq!(state.status(), SessionStatus::AwaitingResponse);
        assert!(!token.is_cancelled());

        assert!(state.finish(EntryId::new(1)).is_some());
        assert_eq!(state.status(), SessionStatus::Idle);
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_cancel_fires_token() {
        let mut state = SessionState::new();
        let token = state.begin(pending(1)).unwrap();

        assert!(state.cancel().is_some());
        assert!(token.is_cancelled());
        assert!(state.cancel().is_none());
    }
}
