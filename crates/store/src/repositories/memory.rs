use std::collections::HashMap;

use tokio::sync::RwLock;

use intake_core::domain::session::{Session, SessionId};

use super::{SessionStore, StoreError};

/// Process-memory session store; contents are lost on restart.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, Session>>,
}

impl InMemorySessionStore {
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[async_trait::async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, id: &SessionId) -> Result<Option<Session>, StoreError> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(&id.0).cloned())
    }

    async fn put(&self, id: &SessionId, session: Session) -> Result<(), StoreError> {
        let mut sessions = self.sessions.write().await;
        sessions.insert(id.0.clone(), session);
        Ok(())
    }

    async fn delete(&self, id: &SessionId) -> Result<(), StoreError> {
        let mut sessions = self.sessions.write().await;
        sessions.remove(&id.0);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use intake_core::domain::resource::{ResourceRecord, ResourceType};
    use intake_core::domain::session::{Session, SessionId};
    use intake_core::flows::IntakeState;

    use crate::repositories::{InMemorySessionStore, SessionStore};

    fn collecting_session() -> Session {
        let mut session =
            Session { state: IntakeState::AwaitingMoreResources, ..Session::default() };
        session.accept_resource(ResourceRecord {
            resource_type: ResourceType::S3Bucket,
            fields: [("bucket_name", "landing")].into_iter().collect(),
        });
        session
    }

    #[tokio::test]
    async fn in_memory_session_store_round_trip() {
        let store = InMemorySessionStore::default();
        let id = SessionId::from("team-a");
        let session = collecting_session();

        store.put(&id, session.clone()).await.expect("save session");
        let found = store.get(&id).await.expect("find session");

        assert_eq!(found, Some(session));
    }

    #[tokio::test]
    async fn unknown_session_yields_default_without_creating_it() {
        let store = InMemorySessionStore::default();

        let session = store.get_or_default(&SessionId::from("ghost")).await.expect("default");

        assert_eq!(session, Session::default());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn sessions_are_isolated_by_id() {
        let store = InMemorySessionStore::default();
        store.put(&SessionId::from("a"), collecting_session()).await.expect("save a");
        store.put(&SessionId::from("b"), Session::default()).await.expect("save b");

        store.delete(&SessionId::from("b")).await.expect("delete b");

        assert_eq!(store.len().await, 1);
        let a = store.get(&SessionId::from("a")).await.expect("find a").expect("a exists");
        assert_eq!(a.counts().s3_buckets, 1);
    }

    #[tokio::test]
    async fn deleting_twice_is_harmless() {
        let store = InMemorySessionStore::default();
        let id = SessionId::default();
        store.put(&id, collecting_session()).await.expect("save");

        store.delete(&id).await.expect("first delete");
        store.delete(&id).await.expect("second delete");

        assert_eq!(store.get(&id).await.expect("lookup"), None);
    }
}
