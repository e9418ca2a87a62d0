//! Session storage.

use async_trait::async_trait;
use shelf_gate_core::SessionId;
use shelf_gate_platform_access::Session;
use std::collections::HashMap;
use std::fmt;
use tokio::sync::RwLock;

/// Errors from session storage.
#[derive(Debug)]
pub enum SessionStoreError {
    /// The backing database failed.
    Database { details: String },
}

impl fmt::Display for SessionStoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Database { details } => write!(f, "session database error: {}", details),
        }
    }
}

impl std::error::Error for SessionStoreError {}

impl From<sqlx::Error> for SessionStoreError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database {
            details: err.to_string(),
        }
    }
}

/// Server-side session storage keyed by session id.
///
/// Saves are last-writer-wins; there is no cross-request locking.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Loads a session. Expired sessions are treated as absent.
    async fn load(&self, id: &SessionId) -> Result<Option<Session>, SessionStoreError>;

    /// Inserts or overwrites a session.
    async fn save(&self, session: &Session) -> Result<(), SessionStoreError>;

    async fn delete(&self, id: &SessionId) -> Result<(), SessionStoreError>;

    /// Deletes expired sessions, returning how many were removed.
    async fn delete_expired(&self) -> Result<u64, SessionStoreError>;
}

/// In-process session store.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<SessionId, Session>>,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self, id: &SessionId) -> Result<Option<Session>, SessionStoreError> {
        Ok(self
            .sessions
            .read()
            .await
            .get(id)
            .filter(|session| !session.is_expired())
            .cloned())
    }

    async fn save(&self, session: &Session) -> Result<(), SessionStoreError> {
        self.sessions
            .write()
            .await
            .insert(session.id(), session.clone());
        Ok(())
    }

    async fn delete(&self, id: &SessionId) -> Result<(), SessionStoreError> {
        self.sessions.write().await.remove(id);
        Ok(())
    }

    async fn delete_expired(&self) -> Result<u64, SessionStoreError> {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired());
        Ok((before - sessions.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use shelf_gate_platform_access::RoleSet;

    fn session(expires_in: Duration) -> Session {
        let now = Utc::now();
        Session::with_all_fields(
            SessionId::new(),
            "alice".to_string(),
            None,
            Some("token".to_string()),
            None,
            RoleSet::from_names(["user"]),
            now - Duration::hours(2),
            now + expires_in,
        )
    }

    #[tokio::test]
    async fn save_then_load() {
        let store = MemorySessionStore::new();
        let session = session(Duration::hours(1));
        store.save(&session).await.expect("save");

        let loaded = store.load(&session.id()).await.expect("load");
        assert_eq!(loaded, Some(session));
    }

    #[tokio::test]
    async fn expired_session_is_absent() {
        let store = MemorySessionStore::new();
        let session = session(Duration::minutes(-1));
        store.save(&session).await.expect("save");

        assert_eq!(store.load(&session.id()).await.expect("load"), None);
    }

    #[tokio::test]
    async fn delete_expired_sweeps_only_expired() {
        let store = MemorySessionStore::new();
        let live = session(Duration::hours(1));
        let stale = session(Duration::minutes(-5));
        store.save(&live).await.expect("save");
        store.save(&stale).await.expect("save");

        assert_eq!(store.delete_expired().await.expect("sweep"), 1);
        assert!(store.load(&live.id()).await.expect("load").is_some());
    }

    #[tokio::test]
    async fn delete_removes_session() {
        let store = MemorySessionStore::new();
        let session = session(Duration::hours(1));
        store.save(&session).await.expect("save");
        store.delete(&session.id()).await.expect("delete");

        assert_eq!(store.load(&session.id()).await.expect("load"), None);
    }
}
