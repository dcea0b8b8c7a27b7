use async_trait::async_trait;
use thiserror::Error;

use intake_core::domain::session::{Session, SessionId};

pub mod memory;

pub use memory::InMemorySessionStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("session store unavailable: {0}")]
    Unavailable(String),
}

/// Keyed session persistence. Implementations must tolerate unknown ids.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, id: &SessionId) -> Result<Option<Session>, StoreError>;
    async fn put(&self, id: &SessionId, session: Session) -> Result<(), StoreError>;
    async fn delete(&self, id: &SessionId) -> Result<(), StoreError>;

    /// Returns the stored session, or a fresh default one without storing it.
    async fn get_or_default(&self, id: &SessionId) -> Result<Session, StoreError> {
        Ok(self.get(id).await?.unwrap_or_default())
    }
}
