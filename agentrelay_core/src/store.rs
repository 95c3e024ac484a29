//! Process-wide conversation state.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{RelayError, Result, Role, Session, SessionSummary, Turn};

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Insert an empty session under a fresh identifier and return it.
    async fn create_session(&self) -> String;

    /// Read-only lookup. Never creates a session.
    async fn get_session(&self, id: &str) -> Result<Session>;

    /// Return the session for `id`, creating an empty one if it is unknown.
    async fn get_or_create_session(&self, id: &str) -> Session;

    async fn append_turn(&self, id: &str, role: Role, content: &str) -> Result<()>;

    /// Drop every turn but keep the session's id and creation time.
    async fn clear_messages(&self, id: &str) -> Result<()>;

    async fn list_sessions(&self) -> Vec<SessionSummary>;
}

/// Sessions held in memory for the lifetime of the process.
///
/// Nothing is ever evicted. Each operation takes the lock once and never
/// across an await point, so a turn is either fully visible or absent.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, Session>>,
}

impl InMemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create_session(&self) -> String {
        let mut sessions = self.sessions.write().await;
        loop {
            let id = Uuid::now_v7().to_string();
            if let Entry::Vacant(slot) = sessions.entry(id.clone()) {
                slot.insert(Session::new(id.clone()));
                info!("Created session: {id}");
                return id;
            }
        }
    }

    async fn get_session(&self, id: &str) -> Result<Session> {
        self.sessions
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| RelayError::NotFound(id.to_string()))
    }

    async fn get_or_create_session(&self, id: &str) -> Session {
        if let Some(session) = self.sessions.read().await.get(id) {
            return session.clone();
        }

        self.sessions
            .write()
            .await
            .entry(id.to_string())
            .or_insert_with(|| {
                info!("Session {id} not found, creating it");
                Session::new(id)
            })
            .clone()
    }

    async fn append_turn(&self, id: &str, role: Role, content: &str) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(id)
            .ok_or_else(|| RelayError::NotFound(id.to_string()))?;

        session.messages.push(Turn::new(role, content));
        debug!(
            "Appended {role:?} turn to session {id} ({} turns)",
            session.messages.len()
        );
        Ok(())
    }

    async fn clear_messages(&self, id: &str) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(id)
            .ok_or_else(|| RelayError::NotFound(id.to_string()))?;

        session.messages.clear();
        info!("Cleared session: {id}");
        Ok(())
    }

    async fn list_sessions(&self) -> Vec<SessionSummary> {
        self.sessions
            .read()
            .await
            .values()
            .map(Session::summary)
            .collect()
    }
}

#[async_trait]
impl<T: SessionStore + ?Sized> SessionStore for Arc<T> {
    async fn create_session(&self) -> String {
        (**self).create_session().await
    }

    async fn get_session(&self, id: &str) -> Result<Session> {
        (**self).get_session(id).await
    }

    async fn get_or_create_session(&self, id: &str) -> Session {
        (**self).get_or_create_session(id).await
    }

    async fn append_turn(&self, id: &str, role: Role, content: &str) -> Result<()> {
        (**self).append_turn(id, role, content).await
    }

    async fn clear_messages(&self, id: &str) -> Result<()> {
        (**self).clear_messages(id).await
    }

    async fn list_sessions(&self) -> Vec<SessionSummary> {
        (**self).list_sessions().await
    }
}
