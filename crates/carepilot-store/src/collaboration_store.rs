use crate::json_dir::JsonDir;
use async_trait::async_trait;
use carepilot_core::{CarePilotError, CarePilotResult, CollaborationSession};
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::RwLock;

/// Durable record of collaboration sessions.
#[async_trait]
pub trait CollaborationStore: Send + Sync {
    async fn create(&self, session: &CollaborationSession) -> CarePilotResult<CollaborationSession>;
    /// All records stored under `session_id` (zero or one for the bundled stores).
    async fn list_by_session_id(
        &self,
        session_id: &str,
    ) -> CarePilotResult<Vec<CollaborationSession>>;
    /// Overwrite an existing session. Returns `None` if it does not exist.
    async fn update(
        &self,
        session: &CollaborationSession,
    ) -> CarePilotResult<Option<CollaborationSession>>;

    async fn get(&self, session_id: &str) -> CarePilotResult<Option<CollaborationSession>> {
        Ok(self.list_by_session_id(session_id).await?.into_iter().next())
    }
}

#[derive(Default)]
pub struct InMemoryCollaborationStore {
    sessions: RwLock<HashMap<String, CollaborationSession>>,
}

impl InMemoryCollaborationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CollaborationStore for InMemoryCollaborationStore {
    async fn create(&self, session: &CollaborationSession) -> CarePilotResult<CollaborationSession> {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&session.session_id) {
            return Err(CarePilotError::Store(format!(
                "session {} already exists",
                session.session_id
            )));
        }
        sessions.insert(session.session_id.clone(), session.clone());
        Ok(session.clone())
    }

    async fn list_by_session_id(
        &self,
        session_id: &str,
    ) -> CarePilotResult<Vec<CollaborationSession>> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(session_id).cloned().into_iter().collect())
    }

    async fn update(
        &self,
        session: &CollaborationSession,
    ) -> CarePilotResult<Option<CollaborationSession>> {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(&session.session_id) {
            Some(slot) => {
                *slot = session.clone();
                Ok(Some(session.clone()))
            }
            None => Ok(None),
        }
    }
}

/// File-based session store (JSON files on disk).
pub struct FileCollaborationStore {
    records: JsonDir,
}

impl FileCollaborationStore {
    pub async fn new(dir: PathBuf) -> CarePilotResult<Self> {
        Ok(Self {
            records: JsonDir::open(dir).await?,
        })
    }
}

#[async_trait]
impl CollaborationStore for FileCollaborationStore {
    async fn create(&self, session: &CollaborationSession) -> CarePilotResult<CollaborationSession> {
        if self.records.exists(&session.session_id).await {
            return Err(CarePilotError::Store(format!(
                "session {} already exists",
                session.session_id
            )));
        }
        self.records.write(&session.session_id, session).await?;
        Ok(session.clone())
    }

    async fn list_by_session_id(
        &self,
        session_id: &str,
    ) -> CarePilotResult<Vec<CollaborationSession>> {
        Ok(self
            .records
            .read::<CollaborationSession>(session_id)
            .await?
            .into_iter()
            .collect())
    }

    async fn update(
        &self,
        session: &CollaborationSession,
    ) -> CarePilotResult<Option<CollaborationSession>> {
        if !self.records.exists(&session.session_id).await {
            return Ok(None);
        }
        self.records.write(&session.session_id, session).await?;
        Ok(Some(session.clone()))
    }
}
