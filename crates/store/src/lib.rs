pub mod locks;
pub mod repositories;

pub use locks::{SessionLocks, SessionTurn};
pub use repositories::{InMemorySessionStore, SessionStore, StoreError};
