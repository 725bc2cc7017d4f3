use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Per-session turn serialization.
///
/// Turns of one session run strictly one after another; turns of different
/// sessions never wait on each other.
pub struct SessionLocks {
    locks: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl SessionLocks {
    pub fn new() -> Self {
        Self {
            locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Waits for exclusive access to `session_id`.
    ///
    /// The returned guard releases the session when dropped.
    pub async fn acquire(&self, session_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            // Entries referenced only by the map have no holder or waiter.
            locks.retain(|id, lock| id == session_id || Arc::strong_count(lock) > 1);
            locks
                .entry(session_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }

    /// Number of sessions currently tracked.
    pub async fn len(&self) -> usize {
        self.locks.lock().await.len()
    }
}

impl Default for SessionLocks {
    fn default() -> Self {
        Self::new()
    }
}
