//! In-memory session store
//!
//! Sessions live only as long as the process. Each session has its own lock;
//! callers mutate through `update`, which never spans an await. Sessions idle
//! past the TTL are evicted by the sweeper, and `create` refuses new sessions
//! once the store is at capacity.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use parking_lot::{Mutex, RwLock};
use uuid::Uuid;

use crate::constants;
use crate::logic::session::Session;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Session limit of {0} reached, try again later")]
    Full(usize),
}

#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, Arc<Mutex<Session>>>>>,
    idle_ttl: Duration,
    capacity: usize,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_limits(
            Duration::seconds(constants::DEFAULT_SESSION_TTL_SECS),
            constants::DEFAULT_MAX_SESSIONS,
        )
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(idle_ttl: Duration, capacity: usize) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            idle_ttl,
            capacity,
        }
    }

    /// Create an idle session and return a snapshot of it
    pub fn create(&self) -> Result<Session, StoreError> {
        if self.len() >= self.capacity {
            self.evict_idle(Utc::now());
        }

        let mut sessions = self.sessions.write();
        if sessions.len() >= self.capacity {
            return Err(StoreError::Full(self.capacity));
        }

        let session = Session::new();
        let snapshot = session.clone();
        sessions.insert(session.id, Arc::new(Mutex::new(session)));
        tracing::debug!("Session {} created", snapshot.id);
        Ok(snapshot)
    }

    pub fn snapshot(&self, id: Uuid) -> Option<Session> {
        let entry = self.sessions.read().get(&id).cloned()?;
        let mut session = entry.lock();
        session.touch(Utc::now());
        Some(session.clone())
    }

    /// Run `f` against the session under its lock. `None` if unknown.
    pub fn update<R>(&self, id: Uuid, f: impl FnOnce(&mut Session) -> R) -> Option<R> {
        let entry = self.sessions.read().get(&id).cloned()?;
        let mut session = entry.lock();
        session.touch(Utc::now());
        Some(f(&mut session))
    }

    /// Drop sessions untouched for longer than the TTL. Sessions with a step
    /// in flight are kept.
    pub fn evict_idle(&self, now: DateTime<Utc>) -> usize {
        let cutoff = now - self.idle_ttl;
        let mut sessions = self.sessions.write();
        let before = sessions.len();

        sessions.retain(|_, entry| {
            let session = entry.lock();
            session.is_busy() || session.last_touched > cutoff
        });

        let evicted = before - sessions.len();
        if evicted > 0 {
            tracing::info!("Evicted {} idle sessions, {} remain", evicted, sessions.len());
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Periodic idle eviction, for the lifetime of the process
pub async fn sweep_loop(store: SessionStore, period: StdDuration) {
    tracing::info!("Session sweeper started, every {:?}", period);

    loop {
        tokio::time::sleep(period).await;
        store.evict_idle(Utc::now());
    }
}
