use crate::orchestrator::{GenerationOrchestrator, OrchestratorSettings, SelectionContext};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use testdeck_core::{Result, TestdeckError};
use testdeck_core::artifact::{
    ArtifactTree, ExpansionResult, NodeId, ProjectSource, SelectionResult, TreeRow,
};
use testdeck_core::engine::GenerationEngine;
use testdeck_core::session::{
    EntryId, LogSnapshot, PendingRequest, SessionEntry, SessionLog, SessionStatus,
};
use tokio::sync::watch;

const ARTIFACT: &str = "artifact";

/// Everything one operator conversation owns: the artifact tree with its
/// selection, the session log and the orchestrator driving requests.
///
/// Sessions share nothing with each other.
pub struct Session {
    id: String,
    tree: Mutex<ArtifactTree>,
    log: Arc<SessionLog>,
    orchestrator: GenerationOrchestrator,
    source: Option<Arc<dyn ProjectSource>>,
}

/// Serializable picture of a session for presentation layers.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub id: String,
    pub tree: Vec<TreeRow>,
    pub selection: Option<NodeId>,
    pub selection_path: Option<String>,
    pub status: SessionStatus,
    pub pending: Option<PendingRequest>,
    pub entries: Vec<SessionEntry>,
}

impl Session {
    pub fn new(
        id: impl Into<String>,
        tree: ArtifactTree,
        engine: Arc<dyn GenerationEngine>,
        log: SessionLog,
        settings: OrchestratorSettings,
    ) -> Self {
        let log = Arc::new(log);
        let orchestrator = GenerationOrchestrator::new(Arc::clone(&log), engine, settings);
        Self {
            id: id.into(),
            tree: Mutex::new(tree),
            log,
            orchestrator,
            source: None,
        }
    }

    /// Loads the initial tree from `source` and remembers it for
    /// [`reload_tree`](Self::reload_tree).
    pub async fn open(
        id: impl Into<String>,
        source: Arc<dyn ProjectSource>,
        engine: Arc<dyn GenerationEngine>,
        log: SessionLog,
        settings: OrchestratorSettings,
    ) -> Result<Self> {
        let tree = source.load().await?;
        let mut session = Self::new(id, tree, engine, log, settings);
        session.source = Some(source);
        Ok(session)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    fn lock_tree(&self) -> MutexGuard<'_, ArtifactTree> {
        self.tree.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ---- Artifact tree ----

    pub fn select(&self, id: &NodeId) -> Result<SelectionResult> {
        let result = self.lock_tree().select(id)?;
        tracing::debug!(session_id = %self.id, node_id = %id, "Selection changed");
        Ok(result)
    }

    pub fn clear_selection(&self) -> Option<NodeId> {
        self.lock_tree().clear_selection()
    }

    pub fn toggle_expand(&self, id: &NodeId) -> Result<ExpansionResult> {
        self.lock_tree().toggle_expand(id)
    }

    pub fn current_selection(&self) -> Option<NodeId> {
        self.lock_tree().current_selection().cloned()
    }

    pub fn visible_rows(&self) -> Vec<TreeRow> {
        self.lock_tree().visible_rows()
    }

    /// Runs `f` against the tree under its lock.
    pub fn with_tree<R>(&self, f: impl FnOnce(&ArtifactTree) -> R) -> R {
        f(&self.lock_tree())
    }

    /// Replaces the tree wholesale. The selection survives only if its id
    /// exists in `next`; the dropped selection is returned.
    pub fn replace_tree(&self, next: ArtifactTree) -> Option<NodeId> {
        let dropped = self.lock_tree().replace(next);
        if let Some(id) = &dropped {
            tracing::info!(session_id = %self.id, node_id = %id, "Selection dropped by tree reload");
        }
        dropped
    }

    /// Re-imports the tree from the project source the session was opened
    /// with. Sessions built from a bare tree have nothing to reload.
    pub async fn reload_tree(&self) -> Result<Option<NodeId>> {
        let source = self
            .source
            .as_ref()
            .ok_or_else(|| TestdeckError::config("session has no project source to reload"))?;
        let next = source.load().await?;
        tracing::info!(session_id = %self.id, source = %source.describe(), "Tree reloaded");
        Ok(self.replace_tree(next))
    }

    // ---- Requests ----

    /// Submits `text` with the tree's current selection, captured now.
    pub fn submit_with_selection(&self, text: &str) -> Result<EntryId> {
        let tree = self.lock_tree();
        let selection = tree.current_selection().map(|id| SelectionContext {
            node: id.clone(),
            path: tree.path_of(id),
        });
        drop(tree);
        self.orchestrator.submit(text, selection)
    }

    /// Submits `text` with an explicit selection context.
    ///
    /// # Errors
    ///
    /// `NotFound` if `selection` is not in the tree, plus everything
    /// [`GenerationOrchestrator::submit`] returns.
    pub fn submit(&self, text: &str, selection: Option<&NodeId>) -> Result<EntryId> {
        let selection = match selection {
            Some(id) => {
                let tree = self.lock_tree();
                if !tree.contains(id) {
                    return Err(TestdeckError::not_found(ARTIFACT, id.as_str()));
                }
                Some(SelectionContext {
                    node: id.clone(),
                    path: tree.path_of(id),
                })
            }
            None => None,
        };
        self.orchestrator.submit(text, selection)
    }

    pub fn cancel(&self) -> bool {
        self.orchestrator.cancel()
    }

    /// Cancels anything in flight and clears the log.
    pub fn reset(&self) {
        self.orchestrator.reset();
    }

    pub fn status(&self) -> SessionStatus {
        self.orchestrator.status()
    }

    pub fn pending(&self) -> Option<PendingRequest> {
        self.orchestrator.pending()
    }

    pub fn orchestrator(&self) -> &GenerationOrchestrator {
        &self.orchestrator
    }

    // ---- Log ----

    pub fn log(&self) -> &SessionLog {
        &self.log
    }

    pub fn entries(&self) -> LogSnapshot {
        self.log.all()
    }

    /// Watches the log version; a change means there is something new to read.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.log.subscribe()
    }

    pub async fn wait_idle(&self) {
        self.orchestrator.wait_idle().await;
    }

    pub fn snapshot(&self) -> SessionView {
        let (tree, selection, selection_path) = {
            let tree = self.lock_tree();
            let selection = tree.current_selection().cloned();
            let path = selection.as_ref().and_then(|id| tree.path_of(id));
            (tree.visible_rows(), selection, path)
        };
        SessionView {
            id: self.id.clone(),
            tree,
            selection,
            selection_path,
            status: self.status(),
            pending: self.pending(),
            entries: self.entries().to_vec(),
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("entries", &self.log.len())
            .field("orchestrator", &self.orchestrator)
            .finish()
    }
}
