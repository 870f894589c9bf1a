//! Generation orchestrator.
//!
//! Owns the request lifecycle of one session: `Idle` → `AwaitingResponse`
//! on submit, back to `Idle` on exactly one of result, failure, timeout or
//! cancel. Every log append for a request cycle happens while the state lock
//! is held (lock order: state, then log), and no lock is held across the
//! engine wait.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use testdeck_core::artifact::NodeId;
use testdeck_core::config::{DEFAULT_CANCELLED_MESSAGE, DEFAULT_ENGINE_TIMEOUT_SECS, SessionSettings};
use testdeck_core::engine::{EngineError, EngineErrorKind, GenerationEngine, GenerationRequest};
use testdeck_core::session::{
    EntryId, PendingRequest, SessionEntry, SessionLog, SessionState, SessionStatus,
};
use testdeck_core::{Result, TestdeckError};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Knobs for one orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorSettings {
    /// Upper bound on one engine dispatch.
    pub timeout: Duration,
    /// Content of the Engine entry recorded on cancel.
    pub cancelled_message: String,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_ENGINE_TIMEOUT_SECS),
            cancelled_message: DEFAULT_CANCELLED_MESSAGE.to_string(),
        }
    }
}

impl From<&SessionSettings> for OrchestratorSettings {
    fn from(settings: &SessionSettings) -> Self {
        Self {
            timeout: settings.engine_timeout(),
            cancelled_message: settings.cancelled_message.clone(),
        }
    }
}

/// The tree selection captured when a request is submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionContext {
    pub node: NodeId,
    /// Slash-joined names from the root, for display and for the engine.
    pub path: Option<String>,
}

/// What happened to an engine completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Recorded as the Engine entry with this id; the session is idle again.
    Applied(EntryId),
    /// The request was no longer pending (cancelled, reset or already
    /// completed); nothing was recorded.
    Ignored,
}

struct Inner {
    state: Mutex<SessionState>,
    log: Arc<SessionLog>,
    engine: Arc<dyn GenerationEngine>,
    settings: OrchestratorSettings,
    status_tx: watch::Sender<SessionStatus>,
}

/// Coordinates submits, the single outstanding engine dispatch and the
/// entries recorded for it.
///
/// Cloning is cheap and yields a handle to the same orchestrator.
#[derive(Clone)]
pub struct GenerationOrchestrator {
    inner: Arc<Inner>,
}

impl GenerationOrchestrator {
    pub fn new(
        log: Arc<SessionLog>,
        engine: Arc<dyn GenerationEngine>,
        settings: OrchestratorSettings,
    ) -> Self {
        let (status_tx, _) = watch::channel(SessionStatus::Idle);
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(SessionState::new()),
                log,
                engine,
                settings,
                status_tx,
            }),
        }
    }

    pub fn log(&self) -> &Arc<SessionLog> {
        &self.inner.log
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.inner.settings
    }

    pub fn status(&self) -> SessionStatus {
        self.inner.lock_state().status()
    }

    /// The request currently awaiting a response, if any.
    pub fn pending(&self) -> Option<PendingRequest> {
        self.inner.lock_state().pending().cloned()
    }

    /// Submits `text` with the selection captured by the caller.
    ///
    /// On success the User entry is already in the log, the session is
    /// `AwaitingResponse` and the engine has been dispatched once. Returns
    /// the id of the User entry, which also identifies the request.
    ///
    /// # Errors
    ///
    /// - `EmptyRequest` if `text` is blank (whitespace only)
    /// - `Busy` if a request is already in flight
    ///
    /// Neither case touches the log or dispatches anything.
    pub fn submit(&self, text: &str, selection: Option<SelectionContext>) -> Result<EntryId> {
        if text.trim().is_empty() {
            return Err(TestdeckError::EmptyRequest);
        }

        let (request, cancel) = {
            let mut state = self.inner.lock_state();
            state.ensure_idle()?;

            let request_id = self.inner.log.next_id();
            let user_entry = SessionEntry::user(request_id, text);
            let submitted_at = user_entry.created_at.clone();
            self.inner.log.append_pinned(user_entry)?;

            let (selection, selection_path) = match selection {
                Some(ctx) => (Some(ctx.node), ctx.path),
                None => (None, None),
            };
            let cancel = state.begin(PendingRequest {
                request_id,
                text: text.to_string(),
                selection: selection.clone(),
                selection_path: selection_path.clone(),
                submitted_at,
            })?;
            self.inner.status_tx.send_replace(SessionStatus::AwaitingResponse);

            let request = GenerationRequest {
                request_id,
                text: text.to_string(),
                selection_context: selection,
                selection_path,
            };
            (request, cancel)
        };

        let request_id = request.request_id;
        tracing::info!(
            request_id = %request_id,
            engine = self.inner.engine.name(),
            selection = request.selection_context.as_ref().map(|n| n.as_str()),
            "Request submitted"
        );

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(Inner::dispatch(Arc::clone(&self.inner), request, cancel));
            }
            Err(e) => {
                // The User entry stays visible; the cycle closes as a failure.
                tracing::warn!(request_id = %request_id, error = %e, "Dispatch could not start");
                self.inner.on_engine_failure(
                    request_id,
                    TestdeckError::EngineFailure(format!("dispatch could not start: {}", e)),
                );
            }
        }

        Ok(request_id)
    }

    /// Records a successful engine result for `request_id`.
    pub fn on_engine_result(&self, request_id: EntryId, content: impl Into<String>) -> Completion {
        self.inner.on_engine_result(request_id, content.into())
    }

    /// Records an engine failure for `request_id` as an Engine entry holding
    /// the rendered error. There is no automatic retry.
    pub fn on_engine_failure(&self, request_id: EntryId, error: TestdeckError) -> Completion {
        self.inner.on_engine_failure(request_id, error)
    }

    /// Cancels the in-flight request.
    ///
    /// Fires the cancellation token, records the cancelled notice and
    /// returns to `Idle`. Returns `false` (and does nothing) when idle. A
    /// completion that arrives afterwards is ignored.
    pub fn cancel(&self) -> bool {
        let mut state = self.inner.lock_state();
        let Some(pending) = state.cancel() else {
            return false;
        };

        let entry = SessionEntry::engine(
            self.inner.log.next_id(),
            self.inner.settings.cancelled_message.as_str(),
        );
        self.inner.record(entry, pending.request_id);
        tracing::info!(request_id = %pending.request_id, "Request cancelled");
        true
    }

    /// Cancels anything in flight and clears the log, atomically with
    /// respect to submits.
    pub fn reset(&self) {
        let mut state = self.inner.lock_state();
        if let Some(pending) = state.cancel() {
            tracing::debug!(request_id = %pending.request_id, "Request dropped by reset");
        }
        self.inner.log.clear();
        self.inner.status_tx.send_replace(SessionStatus::Idle);
        tracing::info!("Session reset");
    }

    /// Watches status changes.
    pub fn subscribe_status(&self) -> watch::Receiver<SessionStatus> {
        self.inner.status_tx.subscribe()
    }

    /// Resolves once the session is idle.
    pub async fn wait_idle(&self) {
        let mut rx = self.inner.status_tx.subscribe();
        // The sender lives as long as `self`, so the channel cannot close.
        let _ = rx.wait_for(|status| *status == SessionStatus::Idle).await;
    }
}

impl std::fmt::Debug for GenerationOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationOrchestrator")
            .field("engine", &self.inner.engine.name())
            .field("status", &self.status())
            .field("settings", &self.inner.settings)
            .finish()
    }
}

impl Inner {
    // State is only mutated through `SessionState` methods that leave it
    // consistent, so a poisoned guard still holds valid data.
    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn dispatch(inner: Arc<Inner>, request: GenerationRequest, cancel: CancellationToken) {
        let request_id = request.request_id;
        let timeout = inner.settings.timeout;
        let engine = Arc::clone(&inner.engine);
        let started = tokio::time::Instant::now();

        let outcome = tokio::select! {
            biased;
            // `cancel()` / `reset()` already closed the cycle.
            _ = cancel.cancelled() => return,
            outcome = tokio::time::timeout(timeout, engine.generate(request, cancel.clone())) => outcome,
        };

        match outcome {
            Ok(Ok(response)) => {
                inner.on_engine_result(request_id, response.content);
            }
            // A timeout the engine hit on its own side reads the same as ours.
            Ok(Err(error)) if error.kind == EngineErrorKind::Timeout => {
                let after_ms = started.elapsed().as_millis() as u64;
                tracing::warn!(request_id = %request_id, error = %error, "Engine reported timeout");
                inner.on_engine_failure(request_id, TestdeckError::Timeout { after_ms });
            }
            Ok(Err(error)) => {
                tracing::warn!(request_id = %request_id, error = %error, "Engine reported failure");
                inner.on_engine_failure(request_id, error.into());
            }
            Err(_) => {
                cancel.cancel();
                tracing::warn!(
                    request_id = %request_id,
                    timeout_ms = timeout.as_millis() as u64,
                    "Engine timed out"
                );
                inner.on_engine_failure(
                    request_id,
                    TestdeckError::Timeout {
                        after_ms: timeout.as_millis() as u64,
                    },
                );
            }
        }
    }

    fn on_engine_result(&self, request_id: EntryId, content: String) -> Completion {
        let mut state = self.lock_state();
        if state.finish(request_id).is_none() {
            tracing::debug!(request_id = %request_id, "Ignoring late engine result");
            return Completion::Ignored;
        }

        let entry = SessionEntry::engine(self.log.next_id(), content);
        let entry_id = entry.id;
        self.record(entry, request_id);
        tracing::info!(request_id = %request_id, entry_id = %entry_id, "Engine result recorded");
        Completion::Applied(entry_id)
    }

    fn on_engine_failure(&self, request_id: EntryId, error: TestdeckError) -> Completion {
        let mut state = self.lock_state();
        if state.finish(request_id).is_none() {
            tracing::debug!(request_id = %request_id, error = %error, "Ignoring late engine failure");
            return Completion::Ignored;
        }

        let entry = SessionEntry::engine(self.log.next_id(), error.to_string());
        let entry_id = entry.id;
        self.record(entry, request_id);
        Completion::Applied(entry_id)
    }

    /// Appends the closing Engine entry of a cycle and returns to `Idle`.
    /// Callers hold the state lock and have already cleared the pending
    /// request.
    fn record(&self, entry: SessionEntry, request_id: EntryId) {
        if let Err(e) = self.log.append(entry) {
            tracing::error!(request_id = %request_id, error = %e, "Failed to record engine entry");
        }
        self.log.release_pin();
        self.status_tx.send_replace(SessionStatus::Idle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use testdeck_core::engine::GenerationResponse;
    use testdeck_core::session::EntryRole;

    /// Engine that never answers on its own.
    struct SilentEngine;

    #[async_trait]
    impl GenerationEngine for SilentEngine {
        fn name(&self) -> &str {
            "silent"
        }

        async fn generate(
            &self,
            _request: GenerationRequest,
            cancel: CancellationToken,
        ) -> std::result::Result<GenerationResponse, EngineError> {
            cancel.cancelled().await;
            Err(EngineError::cancelled())
        }
    }

    fn orchestrator() -> GenerationOrchestrator {
        GenerationOrchestrator::new(
            Arc::new(SessionLog::new()),
            Arc::new(SilentEngine),
            OrchestratorSettings::default(),
        )
    }

    #[test]
    fn test_blank_submit_is_rejected() {
        let orch = orchestrator();
        for text in ["", "   ", "\n\t"] {
            let err = orch.submit(text, None).unwrap_err();
            assert!(err.is_empty_request());
        }
        assert!(orch.log().is_empty());
        assert_eq!(orch.status(), SessionStatus::Idle);
    }

    #[test]
    fn test_submit_without_runtime_closes_cycle() {
        let orch = orchestrator();
        let request_id = orch.submit("add login test", None).unwrap();

        let entries = orch.log().all().to_vec();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id, request_id);
        assert_eq!(entries[0].role, EntryRole::User);
        assert_eq!(entries[1].role, EntryRole::Engine);
        assert!(entries[1].content.starts_with("Engine failure: dispatch could not start"));
        assert_eq!(orch.status(), SessionStatus::Idle);
    }

    #[tokio::test]
    async fn test_manual_completion_and_late_duplicate() {
        let orch = orchestrator();
        let request_id = orch.submit("x", None).unwrap();
        assert_eq!(orch.status(), SessionStatus::AwaitingResponse);

        assert!(matches!(
            orch.on_engine_result(request_id, "done"),
            Completion::Applied(_)
        ));
        assert_eq!(orch.on_engine_result(request_id, "again"), Completion::Ignored);

        let contents: Vec<_> = orch.log().all().iter().map(|e| e.content.clone()).collect();
        assert_eq!(contents, vec!["x", "done"]);
        assert_eq!(orch.status(), SessionStatus::Idle);
    }

    #[tokio::test]
    async fn test_failure_is_rendered_into_log() {
        let orch = orchestrator();
        let request_id = orch.submit("x", None).unwrap();

        orch.on_engine_failure(
            request_id,
            EngineError::unavailable("connection refused").into(),
        );

        let last = orch.log().last().unwrap();
        assert_eq!(last.role, EntryRole::Engine);
        assert_eq!(last.content, "Engine failure: unavailable: connection refused");
        assert!(orch.pending().is_none());
    }

    #[test]
    fn test_request_text_is_stored_verbatim() {
        let orch = orchestrator();
        let text = "  add login test\n";
        let request_id = orch.submit(text, None).unwrap();

        let first = orch.log().all().iter().next().cloned().unwrap();
        assert_eq!(first.id, request_id);
        assert_eq!(first.content, text);
    }

    /// Engine that reports its own timeout straight away.
    struct TimingOutEngine;

    #[async_trait]
    impl GenerationEngine for TimingOutEngine {
        fn name(&self) -> &str {
            "timing-out"
        }

        async fn generate(
            &self,
            _request: GenerationRequest,
            _cancel: CancellationToken,
        ) -> std::result::Result<GenerationResponse, EngineError> {
            Err(EngineError::timeout(Duration::from_millis(5)))
        }
    }

    #[tokio::test]
    async fn test_engine_reported_timeout_reads_as_timeout() {
        let orch = GenerationOrchestrator::new(
            Arc::new(SessionLog::new()),
            Arc::new(TimingOutEngine),
            OrchestratorSettings::default(),
        );
        orch.submit("x", None).unwrap();
        orch.wait_idle().await;

        let last = orch.log().last().unwrap();
        assert_eq!(last.role, EntryRole::Engine);
        assert!(last.content.starts_with("Timed out after "), "{}", last.content);
        assert!(last.content.ends_with(" ms"));
    }

    #[tokio::test]
    async fn test_cancel_from_idle_is_noop() {
        let orch = orchestrator();
        assert!(!orch.cancel());
        assert!(orch.log().is_empty());
    }

    #[tokio::test]
    async fn test_reset_clears_everything() {
        let orch = orchestrator();
        let request_id = orch.submit("x", None).unwrap();

        orch.reset();
        assert!(orch.log().is_empty());
        assert_eq!(orch.status(), SessionStatus::Idle);
        assert_eq!(orch.on_engine_result(request_id, "late"), Completion::Ignored);
        assert!(orch.log().is_empty());
    }
}
