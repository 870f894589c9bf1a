use super::context::Session;
use crate::orchestrator::OrchestratorSettings;
use std::collections::HashMap;
use std::sync::Arc;
use testdeck_core::Result;
use testdeck_core::artifact::{ArtifactTree, ProjectSource};
use testdeck_core::config::SessionSettings;
use testdeck_core::engine::GenerationEngine;
use testdeck_core::session::SessionLog;
use tokio::sync::RwLock;

/// Holds many isolated sessions keyed by id.
///
/// Every session gets its own tree, log and orchestrator; only the engine
/// handle and the settings are shared.
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<String, Arc<Session>>>>,
    engine: Arc<dyn GenerationEngine>,
    settings: SessionSettings,
}

impl SessionRegistry {
    pub fn new(engine: Arc<dyn GenerationEngine>, settings: SessionSettings) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            engine,
            settings,
        }
    }

    fn new_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    fn new_log(&self) -> SessionLog {
        SessionLog::with_capacity(self.settings.history_capacity)
    }

    /// Creates a session over `tree`.
    pub async fn create(&self, tree: ArtifactTree) -> Arc<Session> {
        let session = Arc::new(Session::new(
            Self::new_id(),
            tree,
            Arc::clone(&self.engine),
            self.new_log(),
            OrchestratorSettings::from(&self.settings),
        ));
        self.insert(Arc::clone(&session)).await;
        session
    }

    /// Creates a session whose tree comes from `source`.
    pub async fn open(&self, source: Arc<dyn ProjectSource>) -> Result<Arc<Session>> {
        let session = Arc::new(
            Session::open(
                Self::new_id(),
                source,
                Arc::clone(&self.engine),
                self.new_log(),
                OrchestratorSettings::from(&self.settings),
            )
            .await?,
        );
        self.insert(Arc::clone(&session)).await;
        Ok(session)
    }

    async fn insert(&self, session: Arc<Session>) {
        tracing::info!(session_id = %session.id(), "Session created");
        let mut sessions = self.sessions.write().await;
        sessions.insert(session.id().to_string(), session);
    }

    pub async fn get(&self, session_id: &str) -> Option<Arc<Session>> {
        let sessions = self.sessions.read().await;
        sessions.get(session_id).cloned()
    }

    /// Removes a session, cancelling its in-flight request.
    pub async fn remove(&self, session_id: &str) -> Option<Arc<Session>> {
        let removed = {
            let mut sessions = self.sessions.write().await;
            sessions.remove(session_id)
        };
        if let Some(session) = &removed {
            session.cancel();
            tracing::info!(session_id = %session_id, "Session removed");
        }
        removed
    }

    pub async fn ids(&self) -> Vec<String> {
        let sessions = self.sessions.read().await;
        let mut ids: Vec<_> = sessions.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
