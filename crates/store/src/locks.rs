use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, MutexGuard, PoisonError};

use tokio::sync::{Mutex, OwnedMutexGuard};

use intake_core::domain::session::SessionId;

type LockMap = HashMap<String, Arc<Mutex<()>>>;

fn lock_map(map: &StdMutex<LockMap>) -> MutexGuard<'_, LockMap> {
    map.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One async mutex per session id. A chat turn holds its session's guard for
/// the whole turn, so turns for the same session run one at a time while other
/// sessions proceed. Entries live only while a turn holds or awaits them.
#[derive(Default)]
pub struct SessionLocks {
    locks: Arc<StdMutex<LockMap>>,
}

impl SessionLocks {
    pub async fn acquire(&self, id: &SessionId) -> SessionTurn {
        let lock = Arc::clone(lock_map(&self.locks).entry(id.0.clone()).or_default());
        let guard = lock.lock_owned().await;
        SessionTurn { id: id.0.clone(), guard: Some(guard), locks: Arc::clone(&self.locks) }
    }

    pub fn tracked(&self) -> usize {
        lock_map(&self.locks).len()
    }
}

/// Exclusive access to one session for the duration of a turn. Dropping it
/// releases the session and forgets the entry when no other turn is waiting.
pub struct SessionTurn {
    id: String,
    guard: Option<OwnedMutexGuard<()>>,
    locks: Arc<StdMutex<LockMap>>,
}

impl Drop for SessionTurn {
    fn drop(&mut self) {
        self.guard.take();
        let mut locks = lock_map(&self.locks);
        // Waiters clone under this map lock; a count of one is the map's own.
        if locks.get(&self.id).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            locks.remove(&self.id);
        }
    }
}
